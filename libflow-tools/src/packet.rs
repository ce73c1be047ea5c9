use crate::duration::Duration;
use pcap_parser::Linktype;

/// A captured frame, as read from the capture file
pub struct Packet<'a> {
    /// Index of the capture interface (always 0 for legacy pcap)
    pub interface: u32,
    /// Name of the capture interface, if recorded in the file (pcap-ng `if_name`)
    pub interface_name: Option<&'a str>,
    pub ts: Duration,
    pub link_type: Linktype,
    /// Captured bytes, without block padding
    pub data: &'a [u8],
    pub caplen: u32,
    pub origlen: u32,
    pub pcap_index: usize,
}
