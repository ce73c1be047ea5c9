use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Counters shared by all the flows of a capture session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    /// Number of flows registered so far
    pub flow_count: u64,
    pub total_bytes_sent: u64,
    pub total_bytes_received: u64,
    pub total_forward_header_bytes: u64,
    pub total_reverse_header_bytes: u64,
}

/// Selects one of the cumulative totals of [`SessionCounters`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    BytesSent,
    BytesReceived,
    ForwardHeaderBytes,
    ReverseHeaderBytes,
}

impl SessionCounters {
    fn total_mut(&mut self, counter: Counter) -> &mut u64 {
        match counter {
            Counter::BytesSent => &mut self.total_bytes_sent,
            Counter::BytesReceived => &mut self.total_bytes_received,
            Counter::ForwardHeaderBytes => &mut self.total_forward_header_bytes,
            Counter::ReverseHeaderBytes => &mut self.total_reverse_header_bytes,
        }
    }

    pub fn total(&self, counter: Counter) -> u64 {
        match counter {
            Counter::BytesSent => self.total_bytes_sent,
            Counter::BytesReceived => self.total_bytes_received,
            Counter::ForwardHeaderBytes => self.total_forward_header_bytes,
            Counter::ReverseHeaderBytes => self.total_reverse_header_bytes,
        }
    }
}

/// State of a capture session
///
/// Counters start at zero and are never reset. Every update goes through
/// [`Session::register_flow`] or [`Session::accumulate`], which serialize
/// access, so a session can be shared between threads.
#[derive(Debug, Default)]
pub struct Session {
    counters: Mutex<SessionCounters>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionCounters> {
        // counters are plain integers, always consistent
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a new flow, and return the updated flow count
    pub fn register_flow(&self) -> u64 {
        let mut counters = self.lock();
        counters.flow_count += 1;
        counters.flow_count
    }

    /// Add `value` to a cumulative total, and return the new total
    ///
    /// While the session has seen only one flow, the total is set to zero
    /// instead: the first flow of a session never contributes to the totals.
    /// The flow count is read when accumulating, not when the flow was
    /// registered.
    pub fn accumulate(&self, counter: Counter, value: u64) -> u64 {
        let mut counters = self.lock();
        let first_flow = counters.flow_count == 1;
        let total = counters.total_mut(counter);
        if first_flow {
            *total = 0;
        } else {
            *total = total.saturating_add(value);
        }
        trace!("accumulate {:?} += {} -> {}", counter, value, *total);
        *total
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> SessionCounters {
        *self.lock()
    }
}
