use crate::packet::FlowPacket;
use serde::Serialize;

/// Direction of a packet, relative to the packet which initiated the flow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Same direction as the first packet of the flow
    Forward,
    /// Response direction
    Reverse,
}

/// The packets of one flow, in capture order, and the capture interface
#[derive(Clone, Debug, Default)]
pub struct FlowContext {
    pub packets: Vec<(FlowPacket, Direction)>,
    /// Name of the network interface of the local machine
    pub interface: String,
}

impl FlowContext {
    pub fn new<S: Into<String>>(interface: S) -> Self {
        FlowContext {
            packets: Vec::new(),
            interface: interface.into(),
        }
    }

    #[inline]
    pub fn push(&mut self, packet: FlowPacket, direction: Direction) {
        self.packets.push((packet, direction));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Iterate over the packets going in `direction`
    pub fn packets_towards(&self, direction: Direction) -> impl Iterator<Item = &FlowPacket> {
        self.packets
            .iter()
            .filter(move |(_, d)| *d == direction)
            .map(|(p, _)| p)
    }
}

/// Source of the elapsed duration of a flow, in seconds
pub trait DurationProvider {
    fn duration(&self, ctx: &FlowContext) -> f64;
}

impl<F> DurationProvider for F
where
    F: Fn(&FlowContext) -> f64,
{
    fn duration(&self, ctx: &FlowContext) -> f64 {
        self(ctx)
    }
}

/// Duration between the earliest and the latest packet timestamps
#[derive(Clone, Copy, Debug, Default)]
pub struct CaptureDuration;

impl DurationProvider for CaptureDuration {
    fn duration(&self, ctx: &FlowContext) -> f64 {
        let timestamps = || ctx.packets.iter().map(|(p, _)| p.ts);
        match (timestamps().min(), timestamps().max()) {
            (Some(first), Some(last)) => (last - first).as_secs_f64(),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::HOST_MAC;
    use libflow_tools::Duration;

    fn packet_at(secs: u32, micros: u32) -> FlowPacket {
        FlowPacket {
            ts: Duration::new(secs, micros),
            source: HOST_MAC,
            protocol: 17,
            length: 80,
            ip_ttl: Some(64),
        }
    }

    #[test]
    fn capture_duration() {
        let mut ctx = FlowContext::new("eth0");
        assert_eq!(CaptureDuration.duration(&ctx), 0.0);
        ctx.push(packet_at(100, 500_000), Direction::Forward);
        assert_eq!(CaptureDuration.duration(&ctx), 0.0);
        // out of order timestamps
        ctx.push(packet_at(99, 0), Direction::Reverse);
        ctx.push(packet_at(102, 0), Direction::Reverse);
        assert_eq!(CaptureDuration.duration(&ctx), 3.0);
    }

    #[test]
    fn closure_duration_provider() {
        let ctx = FlowContext::new("eth0");
        let provider = |_: &FlowContext| 4.5;
        assert_eq!(provider.duration(&ctx), 4.5);
    }

    #[test]
    fn packets_by_direction() {
        let mut ctx = FlowContext::new("eth0");
        ctx.push(packet_at(1, 0), Direction::Forward);
        ctx.push(packet_at(2, 0), Direction::Reverse);
        ctx.push(packet_at(3, 0), Direction::Forward);
        assert_eq!(ctx.packets_towards(Direction::Forward).count(), 2);
        assert_eq!(ctx.packets_towards(Direction::Reverse).count(), 1);
    }
}
