use crate::analyzer::PcapAnalyzer;
use crate::config::Config;
use crate::duration::{Duration, MICROS_PER_SEC};
use crate::error::Error;
use crate::packet::Packet;
use pcap_parser::{Block, Linktype, PcapBlockOwned, PcapError};
use std::cmp::min;
use std::io::Read;

/// Information related to a network interface used for capture
#[derive(Clone, Debug)]
struct InterfaceInfo {
    link_type: Linktype,
    /// Offset to add to timestamps, in seconds
    ts_offset: u64,
    /// Number of timestamp units per second
    ts_unit: u64,
    snaplen: u32,
    name: Option<String>,
}

/// Convert a fractional part expressed in `unit` per second to microseconds
fn to_micros(frac: u32, unit: u64) -> u32 {
    // frac < 2^32 and MICROS_PER_SEC < 2^20: the product fits in a u64
    let micros = u64::from(frac) * u64::from(MICROS_PER_SEC) / unit.max(1);
    micros.min(u64::from(MICROS_PER_SEC - 1)) as u32
}

/// Truncate block data to the captured length (pcap-ng data is padded)
fn captured(data: &[u8], caplen: u32) -> &[u8] {
    &data[..min(data.len(), caplen as usize)]
}

/// pcap/pcap-ng data engine
///
/// `PcapDataEngine` iterates over a pcap input, parses blocks and abstracts the
/// format (pcap or pcap-ng, timestamp resolution, padding) for the analysis.
/// Every packet is given to the wrapped `PcapAnalyzer`.
///
/// ## example
///
/// ```
/// use libflow_tools::{Config, Error, Packet, PcapAnalyzer, PcapDataEngine};
/// #[derive(Default)]
/// pub struct CountingAnalyzer {
///     packet_count: usize,
/// }
///
/// impl PcapAnalyzer for CountingAnalyzer {
///     fn handle_packet(&mut self, _packet: &Packet) -> Result<(), Error> {
///         self.packet_count += 1;
///         Ok(())
///     }
/// }
///
/// let config = Config::default();
/// let mut engine = PcapDataEngine::new(CountingAnalyzer::default(), &config);
///
/// // `engine.run()` can take any `Read` as input
/// use std::io::Cursor;
/// let input = Cursor::new(vec![1, 2, 3, 4, 5]);
/// assert!(engine.run(input).is_err());
/// ```
pub struct PcapDataEngine<A: PcapAnalyzer> {
    analyzer: A,
    capacity: usize,
    interfaces: Vec<InterfaceInfo>,
    pcap_index: usize,
}

impl<A: PcapAnalyzer> PcapDataEngine<A> {
    pub fn new(analyzer: A, config: &Config) -> Self {
        let capacity = config
            .get_usize("buffer_initial_capacity")
            .unwrap_or(128 * 1024);
        PcapDataEngine {
            analyzer,
            capacity,
            interfaces: Vec::new(),
            pcap_index: 0,
        }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut A {
        &mut self.analyzer
    }

    /// Consume the engine, returning the analyzer
    pub fn into_analyzer(self) -> A {
        self.analyzer
    }

    /// Main function: given a reader, read all pcap data and call analyzer for each Packet
    pub fn run<R: Read + Send>(&mut self, reader: R) -> Result<(), Error> {
        let mut reader = pcap_parser::create_reader(self.capacity, reader)?;

        self.analyzer.init()?;
        let mut block_index = 0usize;
        let mut last_incomplete_index = None;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    self.handle_block(&block)?;
                    block_index += 1;
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    if last_incomplete_index == Some(block_index) {
                        warn!(
                            "Could not read complete data block (block_index={})",
                            block_index
                        );
                        warn!("Hint: the reader buffer size may be too small, or the input file may be truncated.");
                        break;
                    }
                    last_incomplete_index = Some(block_index);
                    trace!("need refill");
                    reader.refill()?;
                }
                Err(e) => {
                    let e = e.to_owned_vec();
                    error!("error while reading: {:?} (block_index={})", e, block_index);
                    return Err(Error::Pcap(e));
                }
            }
        }

        self.analyzer.teardown();
        Ok(())
    }

    fn handle_block(&mut self, block: &PcapBlockOwned) -> Result<(), Error> {
        let packet = match block {
            PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                // reset section-related variables
                self.interfaces = Vec::new();
                return Ok(());
            }
            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                let ts_unit = pcap_parser::build_ts_resolution(idb.if_tsresol)
                    .ok_or(Error::Generic("Invalid timestamp resolution"))?;
                self.interfaces.push(InterfaceInfo {
                    link_type: idb.linktype,
                    ts_offset: idb.if_tsoffset as u64,
                    ts_unit,
                    snaplen: idb.snaplen,
                    name: idb.if_name().and_then(Result::ok).map(str::to_owned),
                });
                return Ok(());
            }
            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                self.pcap_index += 1;
                let if_info = self
                    .interfaces
                    .get(epb.if_id as usize)
                    .ok_or(Error::Generic("Packet on undeclared interface"))?;
                let (ts_sec, ts_frac) = pcap_parser::build_ts(
                    epb.ts_high,
                    epb.ts_low,
                    if_info.ts_offset,
                    if_info.ts_unit,
                );
                Packet {
                    interface: epb.if_id,
                    interface_name: if_info.name.as_deref(),
                    ts: Duration::new(ts_sec, to_micros(ts_frac, if_info.ts_unit)),
                    link_type: if_info.link_type,
                    data: captured(epb.data, epb.caplen),
                    caplen: epb.caplen,
                    origlen: epb.origlen,
                    pcap_index: self.pcap_index,
                }
            }
            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                self.pcap_index += 1;
                let if_info = self
                    .interfaces
                    .first()
                    .ok_or(Error::Generic("Packet on undeclared interface"))?;
                let caplen = if if_info.snaplen == 0 {
                    spb.origlen
                } else {
                    min(spb.origlen, if_info.snaplen)
                };
                Packet {
                    interface: 0,
                    interface_name: if_info.name.as_deref(),
                    ts: Duration::default(),
                    link_type: if_info.link_type,
                    data: captured(spb.data, caplen),
                    caplen,
                    origlen: spb.origlen,
                    pcap_index: self.pcap_index,
                }
            }
            PcapBlockOwned::LegacyHeader(hdr) => {
                let ts_unit = if hdr.is_nanosecond_precision() {
                    1_000_000_000
                } else {
                    u64::from(MICROS_PER_SEC)
                };
                self.interfaces.push(InterfaceInfo {
                    link_type: hdr.network,
                    ts_offset: 0,
                    ts_unit,
                    snaplen: hdr.snaplen,
                    name: None,
                });
                trace!("Legacy pcap, link type: {}", hdr.network);
                return Ok(());
            }
            PcapBlockOwned::Legacy(b) => {
                self.pcap_index += 1;
                let if_info = self
                    .interfaces
                    .first()
                    .ok_or(Error::Generic("Packet before pcap header"))?;
                Packet {
                    interface: 0,
                    interface_name: None,
                    ts: Duration::new(b.ts_sec, to_micros(b.ts_usec, if_info.ts_unit)),
                    link_type: if_info.link_type,
                    data: captured(b.data, b.caplen),
                    caplen: b.caplen,
                    origlen: b.origlen,
                    pcap_index: self.pcap_index,
                }
            }
            PcapBlockOwned::NG(Block::InterfaceStatistics(_))
            | PcapBlockOwned::NG(Block::NameResolution(_)) => {
                // just ignore block
                return Ok(());
            }
            _ => {
                warn!("unsupported block");
                return Ok(());
            }
        };
        trace!(
            "packet {}: time {}.{:06}",
            packet.pcap_index,
            packet.ts.secs,
            packet.ts.micros
        );
        self.analyzer.handle_packet(&packet)
    }
}
