#![warn(clippy::all)]

#[macro_use]
extern crate log;

use clap::{crate_version, Parser};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use libflow_bytes::output;
use libflow_bytes::{FlowBytesAnalyzer, ResolverChain, StaticResolver, SysfsResolver};
use libflow_tools::{Config, PcapDataEngine};

/// Byte volume and header size features of the flows of a capture file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Capture interface, used to find the local hardware address
    #[arg(short, long)]
    interface: Option<String>,

    /// Hardware address of the local machine (default: read from the system)
    #[arg(short = 'm', long, value_name = "MAC")]
    local_mac: Option<String>,

    /// Idle time after which a flow is terminated, in seconds
    #[arg(short = 't', long)]
    flow_timeout: Option<f64>,

    /// Output directory
    #[arg(short, long)]
    outdir: Option<String>,

    /// Output file name, in the output directory ("-" for stdout)
    #[arg(short = 'w', long, default_value = "flow-bytes.json")]
    output: String,

    /// Log to stderr instead of the log file
    #[arg(short, long)]
    verbose: bool,

    /// Input file ("-" for stdin)
    input: Option<String>,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file).map_err(io::Error::other)
}

fn init_logging(config: &Config, verbose: bool) {
    let env_filter = EnvFilter::try_from_env("FLOW_BYTES_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(Level::INFO.into()));
    if verbose {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter)
            .compact()
            .init();
    } else {
        let log_file = config.get("log_file").unwrap_or("flow-bytes.log");
        let output_dir = output::get_output_dir(config);
        let file_appender = RollingFileAppender::new(Rotation::NEVER, output_dir, log_file);
        tracing_subscriber::fmt()
            .with_writer(file_appender)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .compact()
            .init();
    }
}

fn build_resolver(config: &Config) -> io::Result<ResolverChain> {
    let resolver = StaticResolver::from_config(config).map_err(io::Error::other)?;
    Ok(ResolverChain::new()
        .with(resolver)
        .with(SysfsResolver::default()))
}

fn open_input(input_filename: &str) -> io::Result<Box<dyn io::Read + Send>> {
    if input_filename == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let path = Path::new(input_filename);
    let file = File::open(path)?;
    let reader: Box<dyn io::Read + Send> = if input_filename.ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else if input_filename.ends_with(".xz") {
        Box::new(XzDecoder::new(file))
    } else if input_filename.ends_with(".lz4") {
        Box::new(lz4::Decoder::new(file)?)
    } else {
        Box::new(file)
    };
    Ok(reader)
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    // load config
    let mut config = Config::default();
    if let Some(filename) = args.config.as_ref() {
        load_config(&mut config, filename)?;
    }
    // override config options from command-line arguments
    if let Some(dir) = args.outdir.as_ref() {
        config.set("output_dir", dir.as_str());
    }
    if let Some(interface) = args.interface.as_ref() {
        config.set("interface", interface.as_str());
    }
    if let Some(timeout) = args.flow_timeout {
        config.set("flow_timeout", timeout);
    }
    if let Some(mac) = args.local_mac.as_ref() {
        let interface = config.get("interface").unwrap_or("eth0").to_owned();
        config.set(&format!("interfaces.{interface}"), mac.as_str());
    }

    init_logging(&config, args.verbose);

    // Now, really start
    info!("flow-bytes {}", crate_version!());

    let input_filename = match args.input.as_ref() {
        Some(s) => s.as_str(),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Input file name cannot be empty",
            ));
        }
    };
    let input_reader = open_input(input_filename)?;

    let resolver = build_resolver(&config)?;
    let analyzer = FlowBytesAnalyzer::new(&config, Box::new(resolver));
    let mut engine = PcapDataEngine::new(analyzer, &config);
    engine.run(input_reader).map_err(|e| {
        error!("analysis failed: {e}");
        io::Error::other(e)
    })?;

    let records = engine.analyzer_mut().take_records();
    if args.output == "-" {
        output::write_records(io::stdout().lock(), &records)?;
    } else {
        let output_dir = output::get_output_dir(&config);
        let file = output::create_file(output_dir, &args.output)?;
        output::write_records(io::BufWriter::new(file), &records)?;
        info!("{} flow records written to {}/{}", records.len(), output_dir, args.output);
    }

    info!("flow-bytes: done, exiting");
    Ok(())
}
