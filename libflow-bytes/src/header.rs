//! Header size model
//!
//! Per-packet overhead is approximated by the size of option-less headers:
//! Ethernet and IPv4 for every packet, plus TCP when the packet carries TCP.
//! The actual headers of the packet (options, IPv6, VLAN tags) are not
//! measured.

use crate::packet::FlowPacket;
use pnet_packet::ethernet::EthernetPacket;
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::tcp::TcpPacket;

/// Modeled header size of `packet`, in bytes
pub fn header_size(packet: &FlowPacket) -> u64 {
    let mut size = EthernetPacket::minimum_packet_size() + Ipv4Packet::minimum_packet_size();
    if packet.protocol == IpNextHeaderProtocols::Tcp.0 {
        size += TcpPacket::minimum_packet_size();
    }
    size as u64
}
