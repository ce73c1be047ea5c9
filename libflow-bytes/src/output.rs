use crate::analyzer::FlowRecord;
use libflow_tools::Config;
use std::fs::File;
use std::io::{Error, Write};
use std::path::PathBuf;

/// Get the base prefix of output directory (or "." if not specified)
pub fn get_output_dir(config: &Config) -> &str {
    config.get("output_dir").unwrap_or(".")
}

/// Create a file to output data
pub fn create_file<P: AsRef<str>>(base: &str, filename: P) -> Result<File, Error> {
    let mut path = PathBuf::from(base);
    path.push(filename.as_ref());
    File::create(path)
}

/// Write records as JSON, one object per line
pub fn write_records<W: Write>(mut w: W, records: &[FlowRecord]) -> Result<(), Error> {
    for record in records {
        serde_json::to_writer(&mut w, record)?;
        w.write_all(b"\n")?;
    }
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accountant::FlowByteFeatures;
    use libflow_tools::FiveTuple;
    use serde_json::Value;

    #[test]
    fn records_as_json_lines() {
        let features = FlowByteFeatures {
            bytes_sent: 160,
            bytes_received: 60,
            sent_rate: 80.0,
            received_rate: 30.0,
            total_bytes_sent: 0,
            total_bytes_received: 0,
            forward_header_bytes: 108,
            reverse_header_bytes: 54,
            forward_rate: 54.0,
            reverse_rate: 27.0,
            total_forward_header_bytes: 0,
            total_reverse_header_bytes: 0,
            header_in_out_ratio: 2.0,
            total_header_in_out_ratio: -1.0,
            initial_ttl: None,
        };
        let record = FlowRecord {
            flow_id: 12,
            five_tuple: FiveTuple::default(),
            first_seen: 1.0,
            last_seen: 3.0,
            packets: 3,
            features,
        };
        let mut out = Vec::new();
        write_records(&mut out, &[record.clone(), record]).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(v["flow_id"], 12);
        assert_eq!(v["bytes_sent"], 160);
        assert_eq!(v["header_in_out_ratio"], 2.0);
        assert_eq!(v["total_header_in_out_ratio"], -1.0);
        assert!(v["initial_ttl"].is_null());
        assert_eq!(v["five_tuple"]["src_port"], 0);
    }

    #[test]
    fn default_output_dir() {
        let mut config = Config::default();
        assert_eq!(get_output_dir(&config), ".");
        config.set("output_dir", "/tmp/out");
        assert_eq!(get_output_dir(&config), "/tmp/out");
    }
}
