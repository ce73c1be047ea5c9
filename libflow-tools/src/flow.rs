use crate::duration::Duration;
use crate::five_tuple::FiveTuple;
use serde::Serialize;

/// Unique `Flow` identifier
pub type FlowID = u64;

/// Network flow information
#[derive(Clone, PartialEq, Eq, Default, Debug, Serialize)]
pub struct Flow {
    /// The `Flow` identifier
    pub flow_id: FlowID,
    /// The `FiveTuple` of the first packet of the `Flow`
    pub five_tuple: FiveTuple,
    /// timestamp of first packet
    pub first_seen: Duration,
    /// timestamp of last seen packet
    pub last_seen: Duration,
}

impl Flow {
    pub fn new(five_tuple: &FiveTuple, ts: Duration) -> Self {
        Flow {
            flow_id: 0,
            five_tuple: five_tuple.clone(),
            first_seen: ts,
            last_seen: ts,
        }
    }
}
