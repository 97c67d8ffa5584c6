//! Car State Replay CLI
//!
//! Runs the car state translator over a recorded frame log. This is the
//! bootstrap layer around the `carstate` library: it owns file I/O,
//! configuration and logging, which the library deliberately does not.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod replay;

/// Car State Replay - translate a CAN frame log into per-cycle vehicle states
#[derive(Parser, Debug)]
#[command(name = "carstate-replay")]
#[command(about = "Replay a CAN frame log through the car state translator", long_about = None)]
#[command(version)]
struct Args {
    /// JSON-lines frame log ({"timestamp_ns", "bus", "can_id", "data"} per line)
    #[arg(short, long, value_name = "FILE")]
    log: PathBuf,

    /// Path to DBC file(s), added to those in the config (can be repeated)
    #[arg(long, value_name = "FILE")]
    dbc: Vec<PathBuf>,

    /// Path to configuration file (car.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file for vehicle states (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the minimum steer-capable speed (m/s)
    #[arg(long, value_name = "M/S")]
    min_steer_speed: Option<f64>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Car State Replay v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using carstate library v{}", carstate::VERSION);

    let mut app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    if let Some(speed) = args.min_steer_speed {
        app_config.car.min_steer_speed = speed;
    }

    let dbc_files: Vec<PathBuf> = app_config
        .dbc_files
        .iter()
        .chain(args.dbc.iter())
        .cloned()
        .collect();
    anyhow::ensure!(!dbc_files.is_empty(), "No DBC file given (use --dbc or dbc_files in the config)");

    let mut db = carstate::signals::SignalDatabase::new();
    for path in &dbc_files {
        let messages = carstate::signals::dbc::parse_dbc_file(path)
            .with_context(|| format!("Failed to load DBC: {:?}", path))?;
        for message in messages {
            db.add_message(message);
        }
    }
    log::info!("Signal database: {} messages", db.num_messages());

    let mut replay = replay::Replay::new(
        &db,
        app_config.car,
        app_config.replay.cycle_ms,
        app_config.replay.require_can_valid,
    )?;

    let input = BufReader::new(
        File::open(&args.log).with_context(|| format!("Failed to open frame log: {:?}", args.log))?,
    );
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = replay.run(input, output)?;

    log::info!(
        "Replayed {} frames in {} cycles: {} written, {} skipped, {} with steering fault",
        summary.frames,
        summary.cycles,
        summary.written,
        summary.skipped,
        summary.fault_cycles
    );

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    // stdout may carry the JSON records, keep logs on stderr
    Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
