use crate::context::FlowContext;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use libflow_tools::{Duration, FiveTuple, Flow, FlowID};
use rand::prelude::*;
use rand_chacha::*;

/// A flow being assembled: its description and its packets so far
#[derive(Debug)]
pub struct TrackedFlow {
    pub flow: Flow,
    pub context: FlowContext,
}

impl TrackedFlow {
    pub fn new(five_tuple: &FiveTuple, ts: Duration, interface: &str) -> Self {
        TrackedFlow {
            flow: Flow::new(five_tuple, ts),
            context: FlowContext::new(interface),
        }
    }
}

/// Storage for flows
///
/// A flow is identified by a `FlowID`. The five-tuple of its first packet and
/// the reverse five-tuple both point to it. Flows are kept in creation order.
pub struct FlowMap {
    trng: ChaChaRng,
    flows: IndexMap<FlowID, TrackedFlow>,
    flows_id: FnvHashMap<FiveTuple, FlowID>,
}

impl Default for FlowMap {
    fn default() -> Self {
        FlowMap {
            trng: ChaChaRng::from_rng(&mut rand::rng()),
            flows: IndexMap::new(),
            flows_id: FnvHashMap::default(),
        }
    }
}

impl FlowMap {
    /// Use provided seed for the random number generator (flow IDs)
    ///
    /// This option is intended for use in testing
    pub fn with_rng_seed(self, seed: u64) -> Self {
        let trng = <ChaChaRng as SeedableRng>::seed_from_u64(seed);
        FlowMap { trng, ..self }
    }

    pub fn lookup_flow(&self, five_t: &FiveTuple) -> Option<FlowID> {
        self.flows_id.get(five_t).copied()
    }

    /// Return the number of flows
    #[inline]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Returns true if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Insert a new flow, reachable from `five_t` and its reverse
    ///
    /// Returns the new flow ID, which is also stored in the flow.
    pub fn insert_flow(&mut self, five_t: FiveTuple, mut flow: TrackedFlow) -> FlowID {
        // get a new flow index (random, non-zero, unused)
        let mut id: FlowID = self.trng.random();
        while id == 0 || self.flows.contains_key(&id) {
            id = self.trng.random();
        }
        trace!("Inserting new flow (id=0x{:x}) {}", id, five_t);
        flow.flow.flow_id = id;
        self.flows.insert(id, flow);
        self.flows_id.insert(five_t.get_reverse(), id);
        self.flows_id.insert(five_t, id);
        id
    }

    /// Return a reference to the flow identified by flow_id
    #[inline]
    pub fn get_flow(&self, flow_id: FlowID) -> Option<&TrackedFlow> {
        self.flows.get(&flow_id)
    }

    /// Return a mutable reference to the flow identified by flow_id
    #[inline]
    pub fn get_flow_mut(&mut self, flow_id: FlowID) -> Option<&mut TrackedFlow> {
        self.flows.get_mut(&flow_id)
    }

    /// Remove a flow, keeping the order of the remaining flows
    pub fn remove_flow(&mut self, flow_id: FlowID) -> Option<TrackedFlow> {
        let tracked = self.flows.shift_remove(&flow_id)?;
        let five_t = &tracked.flow.five_tuple;
        for key in [five_t.get_reverse(), five_t.clone()] {
            if self.flows_id.get(&key) == Some(&flow_id) {
                self.flows_id.remove(&key);
            }
        }
        Some(tracked)
    }

    /// Remove all flows, returning them in creation order
    pub fn drain(&mut self) -> impl Iterator<Item = TrackedFlow> + '_ {
        self.flows_id.clear();
        self.flows.drain(..).map(|(_, f)| f)
    }
}
