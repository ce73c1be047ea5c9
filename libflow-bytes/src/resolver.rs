use crate::error::FeatureError;
use fnv::FnvHashMap;
use libflow_tools::Config;
use pnet_base::MacAddr;
use std::fs;
use std::path::PathBuf;

/// Maps a network interface name to the hardware address of the local machine
///
/// Packets whose link-layer source is this address are counted as sent.
pub trait AddressResolver {
    fn hardware_address(&self, interface: &str) -> Option<MacAddr>;
}

/// Fixed interface to address mapping
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    addresses: FnvHashMap<String, MacAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        StaticResolver::default()
    }

    pub fn insert<S: Into<String>>(&mut self, interface: S, address: MacAddr) {
        self.addresses.insert(interface.into(), address);
    }

    /// Parse and add an address given as text (`aa:bb:cc:dd:ee:ff`)
    pub fn insert_str(&mut self, interface: &str, address: &str) -> Result<(), FeatureError> {
        let mac = address
            .parse::<MacAddr>()
            .map_err(|_| FeatureError::InvalidAddress {
                interface: interface.to_owned(),
                value: address.to_owned(),
            })?;
        self.insert(interface, mac);
        Ok(())
    }

    /// Build from the `[interfaces]` table of the configuration
    pub fn from_config(config: &Config) -> Result<Self, FeatureError> {
        let mut resolver = StaticResolver::new();
        for (interface, address) in config.get_table("interfaces") {
            resolver.insert_str(interface, address)?;
        }
        Ok(resolver)
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl AddressResolver for StaticResolver {
    fn hardware_address(&self, interface: &str) -> Option<MacAddr> {
        self.addresses.get(interface).copied()
    }
}

/// Reads the address of the interface from sysfs (Linux)
#[derive(Clone, Debug)]
pub struct SysfsResolver {
    root: PathBuf,
}

impl Default for SysfsResolver {
    fn default() -> Self {
        SysfsResolver {
            root: PathBuf::from("/sys/class/net"),
        }
    }
}

impl SysfsResolver {
    /// Use another directory than `/sys/class/net`
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        SysfsResolver { root: root.into() }
    }
}

impl AddressResolver for SysfsResolver {
    fn hardware_address(&self, interface: &str) -> Option<MacAddr> {
        let path = self.root.join(interface).join("address");
        match fs::read_to_string(&path) {
            Ok(s) => s.trim().parse().ok(),
            Err(e) => {
                debug!("cannot read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Asks each resolver in turn, and returns the first address found
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn AddressResolver + Send + Sync>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        ResolverChain::default()
    }

    pub fn with<R: AddressResolver + Send + Sync + 'static>(mut self, resolver: R) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl AddressResolver for ResolverChain {
    fn hardware_address(&self, interface: &str) -> Option<MacAddr> {
        self.resolvers
            .iter()
            .find_map(|r| r.hardware_address(interface))
    }
}
