use crate::error::Error;
use crate::packet::Packet;

/// Common trait for capture analyzers
pub trait PcapAnalyzer {
    /// Initialization function, call before reading pcap data (optional)
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Callback function for every captured Packet
    fn handle_packet(&mut self, packet: &Packet) -> Result<(), Error>;

    /// Teardown function, called after reading pcap data (optional)
    fn teardown(&mut self) {}
}
