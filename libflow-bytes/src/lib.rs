//! Byte volume and header size features of bidirectional network flows
//!
//! The [`FlowAccountant`] computes, for one flow, the bytes sent and received
//! by the local machine, the header bytes in each flow direction, the derived
//! rates and ratios, and the initial TTL. Totals across all the flows of a
//! capture session are kept in a shared [`Session`].
//!
//! [`FlowBytesAnalyzer`] assembles flows from a packet stream (see
//! `libflow_tools::PcapDataEngine`) and produces one [`FlowRecord`] per flow.

#[macro_use]
extern crate log;

mod accountant;
mod analyzer;
mod context;
mod error;
mod flow_map;
mod header;
mod packet;
mod resolver;
mod session;

pub mod output;

pub use accountant::*;
pub use analyzer::*;
pub use context::*;
pub use error::FeatureError;
pub use flow_map::*;
pub use header::*;
pub use packet::*;
pub use resolver::*;
pub use session::*;

pub use pnet_base::MacAddr;

#[cfg(test)]
pub(crate) mod test_utils;
