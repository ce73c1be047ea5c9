use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Network 5-tuple: layer 4 protocol, addresses and ports
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct FiveTuple {
    /// Layer 4 protocol (e.g TCP, UDP, ICMP)
    pub proto: u8,
    pub src: IpAddr,
    pub dst: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FiveTuple {
    /// The 5-tuple of packets going in the opposite direction
    pub fn get_reverse(&self) -> FiveTuple {
        FiveTuple {
            proto: self.proto,
            src: self.dst,
            dst: self.src,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }
}

impl Default for FiveTuple {
    fn default() -> Self {
        FiveTuple {
            proto: 0,
            src: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            dst: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            src_port: 0,
            dst_port: 0,
        }
    }
}

impl fmt::Display for FiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}]:{} -> [{}]:{} [{}]",
            self.src, self.src_port, self.dst, self.dst_port, self.proto
        )
    }
}

#[cfg(test)]
mod tests {
    use super::FiveTuple;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn five_tuple_reverse() {
        let t5 = FiveTuple {
            proto: 6,
            src: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            dst: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            src_port: 34567,
            dst_port: 443,
        };
        let rev = t5.get_reverse();
        assert_eq!(rev.src, t5.dst);
        assert_eq!(rev.dst_port, 34567);
        assert_eq!(rev.get_reverse(), t5);
        assert_eq!(t5.to_string(), "[10.0.0.1]:34567 -> [10.0.0.2]:443 [6]");
    }
}
