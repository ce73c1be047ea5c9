use crate::accountant::{FlowAccountant, FlowByteFeatures};
use crate::context::{CaptureDuration, Direction};
use crate::flow_map::{FlowMap, TrackedFlow};
use crate::packet::FlowPacket;
use crate::resolver::AddressResolver;
use crate::session::Session;
use libflow_tools::{Config, Duration, Error, FiveTuple, FlowID, Linktype, Packet, PcapAnalyzer, MICROS_PER_SEC};
use serde::Serialize;
use std::sync::Arc;

/// Default idle time after which a flow is terminated, in seconds
pub const DEFAULT_FLOW_TIMEOUT: f64 = 120.0;

/// Features of one terminated flow
#[derive(Clone, Debug, Serialize)]
pub struct FlowRecord {
    pub flow_id: FlowID,
    pub five_tuple: FiveTuple,
    /// Timestamp of the first packet, in seconds
    pub first_seen: f64,
    /// Timestamp of the last packet, in seconds
    pub last_seen: f64,
    pub packets: usize,
    #[serde(flatten)]
    pub features: FlowByteFeatures,
}

/// Assembles packets into flows, and computes the byte features of each flow
/// when it terminates
///
/// Packets are grouped by five-tuple, in both directions. A flow terminates when
/// its next packet comes more than `flow_timeout` seconds after the previous
/// one (the packet then starts a new flow), or at the end of the capture.
///
/// Each flow is bound to the capture interface of its first packet, named by
/// (in order): the `capture_interfaces` list of the configuration, indexed by
/// the pcap-ng interface number; the `interface` configuration key, for the
/// first interface only; the `if_name` recorded in the capture file; the
/// `interface` key, or `eth0`.
pub struct FlowBytesAnalyzer {
    flows: FlowMap,
    session: Arc<Session>,
    resolver: Box<dyn AddressResolver + Send + Sync>,
    interface: String,
    interface_configured: bool,
    capture_interfaces: Vec<String>,
    flow_timeout: Duration,
    records: Vec<FlowRecord>,
    skipped: usize,
}

fn timeout_from_secs(secs: f64) -> Duration {
    let secs = secs.max(0.0);
    let whole = secs.trunc();
    let micros = ((secs - whole) * f64::from(MICROS_PER_SEC)) as u32;
    Duration::new(whole.min(f64::from(u32::MAX)) as u32, micros)
}

impl FlowBytesAnalyzer {
    /// Create an analyzer with a new session
    ///
    /// Configuration keys: `interface` (default `eth0`), `capture_interfaces`,
    /// `flow_timeout` in seconds (default 120).
    pub fn new(config: &Config, resolver: Box<dyn AddressResolver + Send + Sync>) -> Self {
        let interface_configured = config.get("interface").is_some();
        let interface = config.get("interface").unwrap_or("eth0").to_owned();
        let capture_interfaces = config
            .get_list("capture_interfaces")
            .into_iter()
            .map(str::to_owned)
            .collect();
        let flow_timeout = config
            .get_f64("flow_timeout")
            .unwrap_or(DEFAULT_FLOW_TIMEOUT);
        debug!(
            "FlowBytesAnalyzer: interface {}, flow timeout {}s",
            interface, flow_timeout
        );
        FlowBytesAnalyzer {
            flows: FlowMap::default(),
            session: Arc::new(Session::new()),
            resolver,
            interface,
            interface_configured,
            capture_interfaces,
            flow_timeout: timeout_from_secs(flow_timeout),
            records: Vec::new(),
            skipped: 0,
        }
    }

    /// Account flows in an existing session
    pub fn with_session(self, session: Arc<Session>) -> Self {
        FlowBytesAnalyzer { session, ..self }
    }

    /// Use provided seed for flow IDs
    pub fn with_rng_seed(self, seed: u64) -> Self {
        let flows = self.flows.with_rng_seed(seed);
        FlowBytesAnalyzer { flows, ..self }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Records of the flows terminated so far, in termination order
    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<FlowRecord> {
        std::mem::take(&mut self.records)
    }

    /// Number of flows being assembled
    pub fn active_flows(&self) -> usize {
        self.flows.len()
    }

    /// Number of packets ignored (not Ethernet, not IP, or truncated)
    pub fn skipped_packets(&self) -> usize {
        self.skipped
    }

    /// Name of the local interface for packets captured on interface `index`
    pub fn interface_name<'s>(&'s self, index: u32, capture_name: Option<&'s str>) -> &'s str {
        if let Some(name) = self.capture_interfaces.get(index as usize) {
            return name;
        }
        if index == 0 && self.interface_configured {
            return &self.interface;
        }
        capture_name.unwrap_or(self.interface.as_str())
    }

    /// Add one packet to its flow, creating the flow if needed
    ///
    /// A new flow is bound to `interface`.
    pub fn add_packet(&mut self, packet: FlowPacket, five_tuple: FiveTuple, interface: &str) {
        let existing = match self.flows.lookup_flow(&five_tuple) {
            Some(id) => {
                let expired = self
                    .flows
                    .get_flow(id)
                    .map_or(false, |f| packet.ts - f.flow.last_seen > self.flow_timeout);
                if expired {
                    debug!("flow 0x{:x} expired", id);
                    self.terminate_flow(id);
                    None
                } else {
                    Some(id)
                }
            }
            None => None,
        };
        let id = match existing {
            Some(id) => id,
            None => {
                let tracked = TrackedFlow::new(&five_tuple, packet.ts, interface);
                self.flows.insert_flow(five_tuple.clone(), tracked)
            }
        };
        if let Some(tracked) = self.flows.get_flow_mut(id) {
            let direction = if tracked.flow.five_tuple == five_tuple {
                Direction::Forward
            } else {
                Direction::Reverse
            };
            if packet.ts > tracked.flow.last_seen {
                tracked.flow.last_seen = packet.ts;
            }
            tracked.context.push(packet, direction);
        }
    }

    /// Terminate a flow and compute its features
    pub fn terminate_flow(&mut self, flow_id: FlowID) {
        if let Some(tracked) = self.flows.remove_flow(flow_id) {
            let record = self.account(tracked);
            self.records.push(record);
        }
    }

    /// Terminate all flows, in creation order
    pub fn terminate_all(&mut self) {
        let flows: Vec<_> = self.flows.drain().collect();
        for tracked in flows {
            let record = self.account(tracked);
            self.records.push(record);
        }
    }

    fn account(&self, tracked: TrackedFlow) -> FlowRecord {
        let TrackedFlow { flow, context } = tracked;
        let accountant = FlowAccountant::new(
            &context,
            &self.session,
            self.resolver.as_ref(),
            &CaptureDuration,
        );
        let features = accountant.extract();
        FlowRecord {
            flow_id: flow.flow_id,
            five_tuple: flow.five_tuple,
            first_seen: flow.first_seen.as_secs_f64(),
            last_seen: flow.last_seen.as_secs_f64(),
            packets: context.len(),
            features,
        }
    }
}

impl PcapAnalyzer for FlowBytesAnalyzer {
    fn handle_packet(&mut self, packet: &Packet) -> Result<(), Error> {
        if packet.link_type != Linktype::ETHERNET {
            trace!("packet {}: unsupported link type {}", packet.pcap_index, packet.link_type);
            self.skipped += 1;
            return Ok(());
        }
        match FlowPacket::from_ethernet(packet.data, packet.ts) {
            Some((flow_packet, five_tuple)) => {
                let interface = self
                    .interface_name(packet.interface, packet.interface_name)
                    .to_owned();
                self.add_packet(flow_packet, five_tuple, &interface)
            }
            None => {
                trace!("packet {}: not an IP packet", packet.pcap_index);
                self.skipped += 1;
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.terminate_all();
        let counters = self.session.snapshot();
        info!(
            "FlowBytes: {} flows, {} packets skipped",
            counters.flow_count, self.skipped
        );
        info!(
            "FlowBytes: total bytes sent {} received {}",
            counters.total_bytes_sent, counters.total_bytes_received
        );
        info!(
            "FlowBytes: total header bytes forward {} reverse {}",
            counters.total_forward_header_bytes, counters.total_reverse_header_bytes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accountant::UNDEFINED;
    use crate::resolver::StaticResolver;
    use crate::test_utils::*;

    fn analyzer(timeout: u32) -> FlowBytesAnalyzer {
        let mut config = Config::default();
        config.set("interface", "eth0");
        config.set("flow_timeout", timeout);
        let mut resolver = StaticResolver::new();
        resolver.insert("eth0", HOST_MAC);
        FlowBytesAnalyzer::new(&config, Box::new(resolver)).with_rng_seed(3)
    }

    fn feed(a: &mut FlowBytesAnalyzer, frame: &[u8], secs: u32) {
        let packet = Packet {
            interface: 0,
            interface_name: None,
            ts: Duration::new(secs, 0),
            link_type: Linktype::ETHERNET,
            data: frame,
            caplen: frame.len() as u32,
            origlen: frame.len() as u32,
            pcap_index: 0,
        };
        a.handle_packet(&packet).expect("handle_packet");
    }

    fn request(payload: usize) -> Vec<u8> {
        tcp_frame(HOST_MAC, PEER_MAC, (HOST_IP, 41000), (PEER_IP, 443), 64, payload)
    }

    fn response(payload: usize) -> Vec<u8> {
        tcp_frame(PEER_MAC, HOST_MAC, (PEER_IP, 443), (HOST_IP, 41000), 57, payload)
    }

    #[test]
    fn assemble_bidirectional_flow() {
        let mut a = analyzer(120);
        feed(&mut a, &request(46), 100);
        feed(&mut a, &request(6), 101);
        feed(&mut a, &response(6), 102);
        assert_eq!(a.active_flows(), 1);
        a.teardown();
        assert_eq!(a.active_flows(), 0);

        let records = a.records();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.packets, 3);
        assert_eq!(r.five_tuple.src_port, 41000);
        assert_eq!(r.first_seen, 100.0);
        assert_eq!(r.last_seen, 102.0);
        let f = &r.features;
        assert_eq!(f.bytes_sent, 160);
        assert_eq!(f.bytes_received, 60);
        assert_eq!(f.sent_rate, 80.0);
        assert_eq!(f.received_rate, 30.0);
        assert_eq!(f.forward_header_bytes, 108);
        assert_eq!(f.reverse_header_bytes, 54);
        assert_eq!(f.header_in_out_ratio, 2.0);
        assert_eq!(f.initial_ttl, Some(64));
        // first flow of the session
        assert_eq!(f.total_bytes_sent, 0);
        assert_eq!(f.total_header_in_out_ratio, UNDEFINED);
    }

    #[test]
    fn flow_timeout_starts_new_flow() {
        let mut a = analyzer(10);
        feed(&mut a, &request(46), 100);
        feed(&mut a, &response(6), 105);
        // idle for more than 10s
        feed(&mut a, &response(6), 200);
        assert_eq!(a.records().len(), 1);
        a.teardown();

        let records = a.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].packets, 2);
        // the new flow is initiated by the response packet
        assert_eq!(records[1].five_tuple.src_port, 443);
        assert_eq!(records[1].packets, 1);
        assert_eq!(records[1].features.forward_header_bytes, 54);
        assert_eq!(records[1].features.reverse_header_bytes, 0);
        assert_eq!(records[1].features.header_in_out_ratio, UNDEFINED);
        assert_eq!(records[1].features.sent_rate, UNDEFINED);
        // second flow accumulates its own values
        assert_eq!(records[1].features.total_bytes_received, 60);
        assert_eq!(records[1].features.total_forward_header_bytes, 54);
        assert_ne!(records[0].flow_id, records[1].flow_id);
        assert_eq!(a.session().snapshot().flow_count, 2);
    }

    #[test]
    fn non_ethernet_and_non_ip_are_skipped() {
        let mut a = analyzer(120);
        let frame = request(0);
        let packet = Packet {
            interface: 0,
            interface_name: None,
            ts: Duration::new(1, 0),
            link_type: Linktype::RAW,
            data: &frame,
            caplen: frame.len() as u32,
            origlen: frame.len() as u32,
            pcap_index: 1,
        };
        a.handle_packet(&packet).expect("handle_packet");
        let mut arp = request(0);
        arp[12] = 0x08;
        arp[13] = 0x06;
        feed(&mut a, &arp, 2);
        assert_eq!(a.skipped_packets(), 2);
        a.teardown();
        assert!(a.records().is_empty());
        assert_eq!(a.session().snapshot().flow_count, 0);
    }

    #[test]
    fn interface_naming() {
        let resolver = || Box::new(StaticResolver::new());
        let mut config = Config::default();
        let a = FlowBytesAnalyzer::new(&config, resolver());
        assert_eq!(a.interface_name(0, None), "eth0");
        assert_eq!(a.interface_name(0, Some("enp3s0")), "enp3s0");
        assert_eq!(a.interface_name(2, None), "eth0");

        config.set("interface", "ens3");
        let a = FlowBytesAnalyzer::new(&config, resolver());
        assert_eq!(a.interface_name(0, Some("enp3s0")), "ens3");
        assert_eq!(a.interface_name(1, Some("wlan0")), "wlan0");
        assert_eq!(a.interface_name(1, None), "ens3");

        config.set("capture_interfaces", vec!["lan", "wan"]);
        let a = FlowBytesAnalyzer::new(&config, resolver());
        assert_eq!(a.interface_name(0, Some("enp3s0")), "lan");
        assert_eq!(a.interface_name(1, None), "wan");
        assert_eq!(a.interface_name(2, Some("wlan0")), "wlan0");
    }

    #[test]
    fn flows_bound_to_their_capture_interface() {
        let mut config = Config::default();
        config.set("capture_interfaces", vec!["eth0", "wlan0"]);
        let mut resolver = StaticResolver::new();
        resolver.insert("eth0", HOST_MAC);
        // the peer is the local machine on the second interface
        resolver.insert("wlan0", PEER_MAC);
        let mut a = FlowBytesAnalyzer::new(&config, Box::new(resolver)).with_rng_seed(1);

        let first = request(46);
        let second = tcp_frame(PEER_MAC, HOST_MAC, (PEER_IP, 5000), (HOST_IP, 22), 64, 6);
        for (index, frame, secs) in [(0, &first, 1), (1, &second, 2), (0, &first, 3), (1, &second, 4)] {
            let packet = Packet {
                interface: index,
                interface_name: None,
                ts: Duration::new(secs, 0),
                link_type: Linktype::ETHERNET,
                data: frame,
                caplen: frame.len() as u32,
                origlen: frame.len() as u32,
                pcap_index: secs as usize,
            };
            a.handle_packet(&packet).expect("handle_packet");
        }
        a.teardown();

        let records = a.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].features.bytes_sent, 200);
        assert_eq!(records[0].features.bytes_received, 0);
        assert_eq!(records[1].five_tuple.src_port, 5000);
        assert_eq!(records[1].features.bytes_sent, 120);
        assert_eq!(records[1].features.bytes_received, 0);
    }

    #[test]
    fn timeout_conversion() {
        assert_eq!(timeout_from_secs(1.5), Duration::new(1, 500_000));
        assert_eq!(timeout_from_secs(-3.0), Duration::default());
    }
}
