//! CSV Splitter - Command Line Entry Point
//!
//! Splits a large CSV file into size-bounded chunks.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use csv_splitter::{SplitConfig, SplitError, SplitSettings, Splitter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Split a large CSV file into chunks of roughly equal byte size.
#[derive(Debug, Parser)]
#[command(name = "csv-splitter", version, about)]
struct Cli {
    /// Input file, or `-` to read standard input
    input: PathBuf,

    /// Directory the chunks are written to
    #[arg(short, long, default_value = "")]
    output_dir: PathBuf,

    /// Target chunk size in bytes
    #[arg(short = 's', long, env = "CSV_SPLITTER_CHUNK_BYTE_SIZE")]
    chunk_size: Option<u64>,

    /// Do not repeat the header record in every chunk
    #[arg(long)]
    no_header: bool,

    /// Single-byte field separator
    #[arg(short = 'd', long)]
    separator: Option<String>,

    /// Bytes read per I/O call
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name used for chunk files when reading standard input
    #[arg(long, default_value = "stdin.csv")]
    name: PathBuf,

    /// Print a JSON report instead of one path per line
    #[arg(long)]
    json: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Summary printed with `--json`.
#[derive(Debug, Serialize)]
struct SplitReport {
    input: PathBuf,
    chunk_byte_size: u64,
    outputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    let config = build_config(&cli)?;
    info!(
        "Starting CSV Splitter v{} (chunk size: {} bytes)",
        env!("CARGO_PKG_VERSION"),
        config.chunk_byte_size
    );

    let splitter = Splitter::new(config);
    let outputs = if cli.input.as_os_str() == "-" {
        let stdin = io::stdin();
        splitter
            .split_reader(stdin.lock(), &cli.name, None, &cli.output_dir)
            .inspect_err(report_failure)
            .context("failed to split standard input")?
    } else {
        splitter
            .split(&cli.input, &cli.output_dir)
            .inspect_err(report_failure)
            .with_context(|| format!("failed to split {}", cli.input.display()))?
    };

    if cli.json {
        let report = SplitReport {
            input: cli.input.clone(),
            chunk_byte_size: splitter.config().chunk_byte_size,
            outputs,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for path in &outputs {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "csv_splitter=info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init(),
    }
}

/// Log which file a failed split was working on.
///
/// Chunks written before an I/O failure are left in place.
fn report_failure(err: &SplitError) {
    if let Some(path) = err.path() {
        error!(path = %path.display(), io = err.is_io(), "Split aborted");
    }
}

/// Merge the settings file, environment and command line flags.
fn build_config(cli: &Cli) -> Result<SplitConfig> {
    let mut settings =
        SplitSettings::load(cli.config.as_deref()).context("failed to load settings")?;

    if let Some(chunk_size) = cli.chunk_size {
        settings.chunk_byte_size = Some(chunk_size);
    }
    if cli.no_header {
        settings.with_header = false;
    }
    if let Some(separator) = &cli.separator {
        settings.separator = separator.clone();
    }
    if let Some(buffer_size) = cli.buffer_size {
        settings.read_buffer_size = buffer_size;
    }

    SplitConfig::try_from(settings).context("invalid split configuration")
}
