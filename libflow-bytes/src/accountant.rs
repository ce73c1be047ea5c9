//! Byte and header accounting for one flow
//!
//! Two independent partitions of the packets of a flow are used:
//!
//! - *sent* / *received*: the link-layer source of the packet is (or is not)
//!   the hardware address of the local interface;
//! - *forward* / *reverse*: the [`Direction`] assigned when the flow was
//!   assembled.
//!
//! Rates and ratios with a zero denominator are undefined. They are reported as
//! [`UNDEFINED`] (-1) by the plain accessors, and as `None` by the `checked_`
//! variants.

use crate::context::{Direction, DurationProvider, FlowContext};
use crate::error::FeatureError;
use crate::header::header_size;
use crate::packet::FlowPacket;
use crate::resolver::AddressResolver;
use crate::session::{Counter, Session};
use pnet_base::MacAddr;
use serde::Serialize;

/// Value of a rate or ratio which cannot be computed
pub const UNDEFINED: f64 = -1.0;

#[inline]
fn per_second(value: u64, duration: f64) -> Option<f64> {
    if duration > 0.0 {
        Some(value as f64 / duration)
    } else {
        None
    }
}

#[inline]
fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator != 0 {
        Some(numerator as f64 / denominator as f64)
    } else {
        None
    }
}

/// All the byte features of a flow
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowByteFeatures {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub sent_rate: f64,
    pub received_rate: f64,
    pub total_bytes_sent: u64,
    pub total_bytes_received: u64,
    pub forward_header_bytes: u64,
    pub reverse_header_bytes: u64,
    pub forward_rate: f64,
    pub reverse_rate: f64,
    pub total_forward_header_bytes: u64,
    pub total_reverse_header_bytes: u64,
    pub header_in_out_ratio: f64,
    pub total_header_in_out_ratio: f64,
    /// `None` if the first packet has no IPv4 header
    pub initial_ttl: Option<u8>,
}

/// Computes the byte features of one flow
///
/// Creating an accountant registers the flow in the [`Session`]. The per-flow
/// accessors are pure. The `accumulate_total_*` methods add the values of this
/// flow to the session totals: each of them must be called at most once per
/// flow, a second call counts the flow twice. [`FlowAccountant::extract`]
/// calls each of them exactly once.
pub struct FlowAccountant<'a> {
    ctx: &'a FlowContext,
    session: &'a Session,
    local_address: Option<MacAddr>,
    duration: f64,
}

impl<'a> FlowAccountant<'a> {
    pub fn new<R, D>(
        ctx: &'a FlowContext,
        session: &'a Session,
        resolver: &R,
        duration: &D,
    ) -> Self
    where
        R: AddressResolver + ?Sized,
        D: DurationProvider + ?Sized,
    {
        let flow_count = session.register_flow();
        let local_address = resolver.hardware_address(&ctx.interface);
        if local_address.is_none() {
            warn!(
                "no hardware address for interface {:?}, all packets counted as received",
                ctx.interface
            );
        }
        let duration = duration.duration(ctx);
        debug!(
            "flow #{}: {} packets, duration {}s",
            flow_count,
            ctx.len(),
            duration
        );
        FlowAccountant {
            ctx,
            session,
            local_address,
            duration,
        }
    }

    /// Duration of the flow, in seconds
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    fn is_sent(&self, packet: &FlowPacket) -> bool {
        self.local_address == Some(packet.source)
    }

    fn header_bytes(&self, direction: Direction) -> u64 {
        self.ctx.packets_towards(direction).map(header_size).sum()
    }

    /// Bytes of the packets sent by the local machine
    pub fn bytes_sent(&self) -> u64 {
        self.ctx
            .packets
            .iter()
            .filter(|(p, _)| self.is_sent(p))
            .map(|(p, _)| p.length as u64)
            .sum()
    }

    /// Bytes of the packets not sent by the local machine
    pub fn bytes_received(&self) -> u64 {
        self.ctx
            .packets
            .iter()
            .filter(|(p, _)| !self.is_sent(p))
            .map(|(p, _)| p.length as u64)
            .sum()
    }

    pub fn checked_sent_rate(&self) -> Option<f64> {
        per_second(self.bytes_sent(), self.duration)
    }

    /// Bytes sent per second, or [`UNDEFINED`]
    pub fn sent_rate(&self) -> f64 {
        self.checked_sent_rate().unwrap_or(UNDEFINED)
    }

    pub fn checked_received_rate(&self) -> Option<f64> {
        per_second(self.bytes_received(), self.duration)
    }

    /// Bytes received per second, or [`UNDEFINED`]
    pub fn received_rate(&self) -> f64 {
        self.checked_received_rate().unwrap_or(UNDEFINED)
    }

    /// Modeled header bytes of the forward packets
    pub fn forward_header_bytes(&self) -> u64 {
        self.header_bytes(Direction::Forward)
    }

    /// Modeled header bytes of the reverse packets
    pub fn reverse_header_bytes(&self) -> u64 {
        self.header_bytes(Direction::Reverse)
    }

    pub fn checked_forward_rate(&self) -> Option<f64> {
        per_second(self.forward_header_bytes(), self.duration)
    }

    /// Forward header bytes per second, or [`UNDEFINED`]
    pub fn forward_rate(&self) -> f64 {
        self.checked_forward_rate().unwrap_or(UNDEFINED)
    }

    pub fn checked_reverse_rate(&self) -> Option<f64> {
        per_second(self.reverse_header_bytes(), self.duration)
    }

    /// Reverse header bytes per second, or [`UNDEFINED`]
    pub fn reverse_rate(&self) -> f64 {
        self.checked_reverse_rate().unwrap_or(UNDEFINED)
    }

    pub fn checked_header_in_out_ratio(&self) -> Option<f64> {
        ratio(self.forward_header_bytes(), self.reverse_header_bytes())
    }

    /// Forward over reverse header bytes, or [`UNDEFINED`] if there is no
    /// reverse packet
    pub fn header_in_out_ratio(&self) -> f64 {
        self.checked_header_in_out_ratio().unwrap_or(UNDEFINED)
    }

    /// Add the bytes sent by this flow to the session total
    pub fn accumulate_total_bytes_sent(&self) -> u64 {
        self.session.accumulate(Counter::BytesSent, self.bytes_sent())
    }

    /// Add the bytes received by this flow to the session total
    pub fn accumulate_total_bytes_received(&self) -> u64 {
        self.session
            .accumulate(Counter::BytesReceived, self.bytes_received())
    }

    /// Add the forward header bytes of this flow to the session total
    pub fn accumulate_total_forward_header_bytes(&self) -> u64 {
        self.session
            .accumulate(Counter::ForwardHeaderBytes, self.forward_header_bytes())
    }

    /// Add the reverse header bytes of this flow to the session total
    pub fn accumulate_total_reverse_header_bytes(&self) -> u64 {
        self.session
            .accumulate(Counter::ReverseHeaderBytes, self.reverse_header_bytes())
    }

    /// Session-wide forward over reverse header bytes
    ///
    /// Reads the session totals as they are: it does not accumulate this flow.
    pub fn checked_total_header_in_out_ratio(&self) -> Option<f64> {
        let counters = self.session.snapshot();
        ratio(
            counters.total_forward_header_bytes,
            counters.total_reverse_header_bytes,
        )
    }

    pub fn total_header_in_out_ratio(&self) -> f64 {
        self.checked_total_header_in_out_ratio()
            .unwrap_or(UNDEFINED)
    }

    /// Time-to-live of the first packet of the flow
    pub fn initial_ttl(&self) -> Result<u8, FeatureError> {
        let (first, _) = self
            .ctx
            .packets
            .first()
            .ok_or(FeatureError::MissingTtl("flow has no packets"))?;
        first
            .ip_ttl
            .ok_or(FeatureError::MissingTtl("first packet has no IPv4 header"))
    }

    /// Compute all features, updating the session totals once
    pub fn extract(self) -> FlowByteFeatures {
        let total_bytes_sent = self.accumulate_total_bytes_sent();
        let total_bytes_received = self.accumulate_total_bytes_received();
        let total_forward_header_bytes = self.accumulate_total_forward_header_bytes();
        let total_reverse_header_bytes = self.accumulate_total_reverse_header_bytes();
        let initial_ttl = match self.initial_ttl() {
            Ok(ttl) => Some(ttl),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        FlowByteFeatures {
            bytes_sent: self.bytes_sent(),
            bytes_received: self.bytes_received(),
            sent_rate: self.sent_rate(),
            received_rate: self.received_rate(),
            total_bytes_sent,
            total_bytes_received,
            forward_header_bytes: self.forward_header_bytes(),
            reverse_header_bytes: self.reverse_header_bytes(),
            forward_rate: self.forward_rate(),
            reverse_rate: self.reverse_rate(),
            total_forward_header_bytes,
            total_reverse_header_bytes,
            header_in_out_ratio: self.header_in_out_ratio(),
            total_header_in_out_ratio: self.total_header_in_out_ratio(),
            initial_ttl,
        }
    }
}
