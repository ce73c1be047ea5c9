use crate::error::Error;
use std::io;

/// Configuration values, stored as a TOML tree
///
/// Keys are addressed by path: `interfaces.eth0` is the `eth0` entry of the
/// `[interfaces]` table.
#[derive(Clone, Debug)]
pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn lookup(&self, k: &str) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Get an entry by path. If the input argument contains dots, the path is split
    /// into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        self.lookup(k.as_ref())?.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        self.lookup(k.as_ref())?
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Get an entry of type float by path (integers are accepted)
    pub fn get_f64<T: AsRef<str>>(&self, k: T) -> Option<f64> {
        match self.lookup(k.as_ref())? {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get a table by path, as a list of `(key, string value)`
    ///
    /// Entries that are not strings are skipped.
    pub fn get_table<T: AsRef<str>>(&self, k: T) -> Vec<(&str, &str)> {
        match self.lookup(k.as_ref()).and_then(|v| v.as_table()) {
            Some(table) => table
                .iter()
                .filter_map(|(key, v)| v.as_str().map(|s| (key.as_str(), s)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Get an array by path, as a list of strings
    ///
    /// Entries that are not strings are skipped.
    pub fn get_list<T: AsRef<str>>(&self, k: T) -> Vec<&str> {
        match self.lookup(k.as_ref()).and_then(|v| v.as_array()) {
            Some(array) => array.iter().filter_map(|v| v.as_str()).collect(),
            None => Vec::new(),
        }
    }

    /// Set an entry, creating intermediate tables if needed
    ///
    /// Returns `false` if the path crosses a value which is not a table.
    pub fn set<V: Into<toml::Value>>(&mut self, k: &str, v: V) -> bool {
        let mut keys: Vec<&str> = k.split('.').collect();
        let last = match keys.pop() {
            Some(last) => last,
            None => return false,
        };
        let mut item = &mut self.value;
        for key in keys {
            let table = match item.as_table_mut() {
                Some(t) => t,
                None => return false,
            };
            item = table
                .entry(key)
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        match item.as_table_mut() {
            Some(table) => {
                table.insert(last.to_owned(), v.into());
                true
            }
            None => false,
        }
    }

    /// Load configuration from input object. Previously loaded values are replaced
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        let table: toml::Table = toml::from_str(&s)?;
        self.value = toml::Value::Table(table);
        Ok(())
    }
}
