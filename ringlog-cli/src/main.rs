//! CLI for the ringlog record store.
//!
//! Replays input through a record device, seeks into the retained records, and
//! benchmarks the insert path.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use ringlog::{
    CancelToken, DEFAULT_CAPACITY, DeviceConfig, Record, RecordDevice, RecordStore, SeekTo, Session,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Bytes handed to each write call when `--chunk-size` is not given.
const DEFAULT_CHUNK_SIZE: usize = 1000;

/// ringlog — Fixed-capacity ring of newline-delimited records.
#[derive(Parser)]
#[command(name = "ringlog", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Write input through a device and print what the ring retained.
    Replay {
        /// Input file (stdin if omitted).
        input: Option<PathBuf>,

        /// Bytes handed to each write call.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// JSON device config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Replay input, then print from a record ordinal and offset to the end.
    Seek {
        /// Input file (stdin if omitted).
        input: Option<PathBuf>,

        /// Ordinal of the record to seek to (0 = oldest retained).
        #[arg(long)]
        record: u32,

        /// Byte offset inside that record.
        #[arg(long, default_value = "0")]
        offset: u32,

        /// Bytes handed to each write call.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// JSON device config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run an insert-path microbenchmark.
    Bench {
        /// Number of records to insert.
        #[arg(long, default_value = "1000000")]
        records: u64,

        /// Length of each record in bytes.
        #[arg(long, default_value = "64")]
        record_len: usize,
    },
}

/// Output format for replay results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Retained contents as written.
    Text,
    /// Store stats and retained records as a JSON object.
    Json,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            input,
            chunk_size,
            config,
            format,
        } => cmd_replay(input.as_deref(), chunk_size, config.as_deref(), &format),
        Commands::Seek {
            input,
            record,
            offset,
            chunk_size,
            config,
        } => cmd_seek(
            input.as_deref(),
            SeekTo { record, offset },
            chunk_size,
            config.as_deref(),
        ),
        Commands::Bench {
            records,
            record_len,
        } => cmd_bench(records, record_len),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Loads the device config from `path`, or the defaults.
fn load_config(path: Option<&Path>) -> Result<DeviceConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(DeviceConfig::from_json_file(path)?),
        None => Ok(DeviceConfig::default()),
    }
}

fn check_chunk_size(chunk_size: usize) -> CliResult {
    if chunk_size == 0 {
        return Err("--chunk-size must be > 0".into());
    }
    Ok(())
}

/// Opens `input`, or stdin when no path is given.
fn open_input(input: Option<&Path>) -> io::Result<Box<dyn Read>> {
    match input {
        Some(path) => Ok(Box::new(File::open(path)?)),
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Copies `input` into `session` in writes of at most `chunk_size` bytes.
///
/// Returns the number of bytes written.
fn replay_into(
    session: &mut Session<'_, DEFAULT_CAPACITY>,
    mut input: impl Read,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut written = 0u64;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        session.write_all(&buf[..n])?;
        written += n as u64;
    }
    session.flush()?;
    Ok(written)
}

/// Implements `ringlog replay [input]`.
fn cmd_replay(
    input: Option<&Path>,
    chunk_size: usize,
    config: Option<&Path>,
    format: &OutputFormat,
) -> CliResult {
    check_chunk_size(chunk_size)?;
    let config = load_config(config)?;

    let device = RecordDevice::<DEFAULT_CAPACITY>::new(config)?;
    let written = {
        let mut session = device.open();
        let written = replay_into(&mut session, open_input(input)?, chunk_size)?;
        if session.has_partial() {
            info!("input ended without a terminator; trailing bytes discarded");
        }
        written
    };
    debug!(written, chunk_size, "replay finished");

    let cancel = CancelToken::new();
    match format {
        OutputFormat::Text => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&device.contents(&cancel)?)?;
            stdout.flush()?;
        }
        OutputFormat::Json => {
            let records: Vec<String> = device
                .records(&cancel)?
                .iter()
                .map(|record| String::from_utf8_lossy(record).into_owned())
                .collect();
            let output = serde_json::json!({
                "bytes_written": written,
                "stats": device.stats(&cancel)?,
                "records": records,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Implements `ringlog seek [input] --record R --offset M`.
fn cmd_seek(
    input: Option<&Path>,
    target: SeekTo,
    chunk_size: usize,
    config: Option<&Path>,
) -> CliResult {
    check_chunk_size(chunk_size)?;
    let config = load_config(config)?;
    let device = RecordDevice::<DEFAULT_CAPACITY>::new(config)?;

    let mut session = device.open();
    replay_into(&mut session, open_input(input)?, chunk_size)?;

    let position = session.seek_to(target)?;
    debug!(position, "seeked");

    let mut stdout = io::stdout().lock();
    io::copy(&mut session, &mut stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Implements `ringlog bench`.
#[allow(clippy::cast_precision_loss)]
fn cmd_bench(records: u64, record_len: usize) -> CliResult {
    println!("ringlog insert-path benchmark");
    println!("  Records: {records}");
    println!("  Record length: {record_len} bytes");
    println!("  Capacity: {DEFAULT_CAPACITY}");
    println!();

    if records == 0 {
        return Err("--records must be > 0".into());
    }

    let payload = vec![b'x'; record_len];
    let mut store = RecordStore::<DEFAULT_CAPACITY>::new();
    let mut evicted = 0u64;

    let start = Instant::now();
    for _ in 0..records {
        if store.insert(Record::from(payload.as_slice())).is_some() {
            evicted += 1;
        }
    }
    let elapsed = start.elapsed();

    let ns_per_insert = elapsed.as_nanos() as f64 / records as f64;
    let inserts_per_sec = records as f64 / elapsed.as_secs_f64();

    println!("Results:");
    println!("  Evicted: {evicted}");
    println!("  Retained bytes: {}", store.total_size());
    println!("  Elapsed: {elapsed:.3?}");
    println!("  Avg latency: {ns_per_insert:.1} ns/insert");
    println!("  Throughput: {inserts_per_sec:.0} inserts/sec");
    println!();

    Ok(())
}
