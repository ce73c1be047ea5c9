use libflow_tools::{Duration, FiveTuple};
use pnet_base::MacAddr;
use pnet_packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;
use pnet_packet::udp::UdpPacket;
use pnet_packet::vlan::VlanPacket;
use pnet_packet::Packet;
use std::net::IpAddr;

/// The fields of a captured packet used for flow byte accounting
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowPacket {
    /// Capture timestamp
    pub ts: Duration,
    /// Link-layer source address
    pub source: MacAddr,
    /// IP protocol number (next header for IPv6), 0 if unknown
    pub protocol: u8,
    /// Captured length of the whole frame
    pub length: usize,
    /// Time-to-live of the IPv4 header, if any
    pub ip_ttl: Option<u8>,
}

impl FlowPacket {
    /// Parse an Ethernet frame
    ///
    /// Returns the packet and its five-tuple, or `None` if the frame is truncated
    /// or does not carry IPv4 or IPv6.
    pub fn from_ethernet(data: &[u8], ts: Duration) -> Option<(FlowPacket, FiveTuple)> {
        let eth = EthernetPacket::new(data)?;
        let source = eth.get_source();
        let (ethertype, l3_data) = strip_vlan(eth.get_ethertype(), eth.payload())?;
        let (protocol, ip_ttl, five_tuple) = match ethertype {
            EtherTypes::Ipv4 => {
                let ipv4 = Ipv4Packet::new(l3_data)?;
                let proto = ipv4.get_next_level_protocol();
                let (src_port, dst_port) = get_ports(proto, ipv4.payload());
                let t5 = FiveTuple {
                    proto: proto.0,
                    src: IpAddr::V4(ipv4.get_source()),
                    dst: IpAddr::V4(ipv4.get_destination()),
                    src_port,
                    dst_port,
                };
                (proto.0, Some(ipv4.get_ttl()), t5)
            }
            EtherTypes::Ipv6 => {
                let ipv6 = Ipv6Packet::new(l3_data)?;
                let proto = ipv6.get_next_header();
                let (src_port, dst_port) = get_ports(proto, ipv6.payload());
                let t5 = FiveTuple {
                    proto: proto.0,
                    src: IpAddr::V6(ipv6.get_source()),
                    dst: IpAddr::V6(ipv6.get_destination()),
                    src_port,
                    dst_port,
                };
                (proto.0, None, t5)
            }
            e => {
                trace!("not an IP frame (ethertype {})", e);
                return None;
            }
        };
        let packet = FlowPacket {
            ts,
            source,
            protocol,
            length: data.len(),
            ip_ttl,
        };
        Some((packet, five_tuple))
    }
}

/// Skip one 802.1Q (or 802.1ad) tag, if present
fn strip_vlan(ethertype: EtherType, data: &[u8]) -> Option<(EtherType, &[u8])> {
    match ethertype {
        EtherTypes::Vlan | EtherTypes::QinQ => {
            let vlan = VlanPacket::new(data)?;
            let inner = vlan.get_ethertype();
            let offset = VlanPacket::minimum_packet_size();
            Some((inner, &data[offset..]))
        }
        _ => Some((ethertype, data)),
    }
}

/// Source and destination ports for TCP and UDP, (0, 0) otherwise
fn get_ports(proto: IpNextHeaderProtocol, l4_data: &[u8]) -> (u16, u16) {
    match proto {
        IpNextHeaderProtocols::Tcp => TcpPacket::new(l4_data)
            .map(|tcp| (tcp.get_source(), tcp.get_destination()))
            .unwrap_or((0, 0)),
        IpNextHeaderProtocols::Udp => UdpPacket::new(l4_data)
            .map(|udp| (udp.get_source(), udp.get_destination()))
            .unwrap_or((0, 0)),
        _ => (0, 0),
    }
}
