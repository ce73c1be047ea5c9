#[macro_use]
extern crate log;

mod analyzer;
mod config;
mod duration;
mod engine;
mod error;
mod five_tuple;
mod flow;
mod packet;

pub use analyzer::*;
pub use config::Config;
pub use duration::{Duration, MICROS_PER_SEC};
pub use engine::*;
pub use error::*;
pub use five_tuple::*;
pub use flow::*;
pub use packet::Packet;
pub use pcap_parser::Linktype;
