use pnet_base::MacAddr;
use pnet_packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::MutableIpv4Packet;
use pnet_packet::tcp::MutableTcpPacket;
use pnet_packet::udp::MutableUdpPacket;
use std::net::Ipv4Addr;

pub const HOST_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
pub const PEER_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0xfe);
pub const HOST_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub const PEER_IP: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

fn ipv4_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    proto: IpNextHeaderProtocol,
    ttl: u8,
    l4_len: usize,
) -> Vec<u8> {
    let mut buf = vec![0u8; 14 + 20 + l4_len];
    {
        let mut eth = MutableEthernetPacket::new(&mut buf).expect("ethernet");
        eth.set_source(src_mac);
        eth.set_destination(dst_mac);
        eth.set_ethertype(EtherTypes::Ipv4);
    }
    {
        let mut ip = MutableIpv4Packet::new(&mut buf[14..]).expect("ipv4");
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length((20 + l4_len) as u16);
        ip.set_ttl(ttl);
        ip.set_next_level_protocol(proto);
        ip.set_source(src_ip);
        ip.set_destination(dst_ip);
    }
    buf
}

/// Ethernet + IPv4 + TCP frame, with `payload_len` bytes of TCP payload
pub fn tcp_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src: (Ipv4Addr, u16),
    dst: (Ipv4Addr, u16),
    ttl: u8,
    payload_len: usize,
) -> Vec<u8> {
    let mut buf = ipv4_frame(
        src_mac,
        dst_mac,
        src.0,
        dst.0,
        IpNextHeaderProtocols::Tcp,
        ttl,
        20 + payload_len,
    );
    let mut tcp = MutableTcpPacket::new(&mut buf[34..]).expect("tcp");
    tcp.set_source(src.1);
    tcp.set_destination(dst.1);
    tcp.set_data_offset(5);
    buf
}

/// Ethernet + IPv4 + UDP frame, with `payload_len` bytes of UDP payload
pub fn udp_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src: (Ipv4Addr, u16),
    dst: (Ipv4Addr, u16),
    ttl: u8,
    payload_len: usize,
) -> Vec<u8> {
    let mut buf = ipv4_frame(
        src_mac,
        dst_mac,
        src.0,
        dst.0,
        IpNextHeaderProtocols::Udp,
        ttl,
        8 + payload_len,
    );
    let mut udp = MutableUdpPacket::new(&mut buf[34..]).expect("udp");
    udp.set_source(src.1);
    udp.set_destination(dst.1);
    udp.set_length((8 + payload_len) as u16);
    buf
}
