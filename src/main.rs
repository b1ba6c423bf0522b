use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use vcfshard::config::RuntimeConfig;
use vcfshard::ingest::{self, IngestStats};

/// Split keyed VCF rows into per-sample, header-prefixed files
#[derive(Parser)]
#[command(name = "vcfshard")]
#[command(version)]
#[command(about = "Split keyed VCF rows into per-sample, header-prefixed files", long_about = None)]
struct Cli {
    /// Input files of `key<TAB>row` lines (stdin when omitted)
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output root directory (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Partition base name used as the file name inside each key directory
    #[arg(short, long, value_name = "NAME", default_value = "part-00000")]
    partition: String,

    /// Compress output files
    #[arg(long)]
    compress: bool,

    /// Compression codec: gzip, deflate, lz4 or a Hadoop codec class name
    #[arg(long, value_name = "CODEC")]
    codec: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    // Step 3: Initialize tracing
    vcfshard::init_tracing(&config);

    // Step 4: Open the partition output
    let ticks = Arc::new(AtomicU64::new(0));
    let output = vcfshard::init_output(
        &config,
        &cli.partition,
        Arc::new(move || {
            let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 1_000_000 == 0 {
                info!(records = n, "Progress");
            }
        }),
    )?;

    // Step 5: Stream records, then close every destination
    let stats = match ingest_all(&cli.inputs, &config.output.separator, &output) {
        Ok(stats) => stats,
        Err(e) => return Err(close_after_failure(&output, e)),
    };
    let summary = output.close().context("Failed to close partition output")?;

    info!(
        read = stats.read,
        written = stats.written,
        skipped = stats.skipped,
        destinations = summary.destinations.len(),
        "Done"
    );
    Ok(())
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.storage.backend = vcfshard::config::StorageBackend::Fs;
        config.storage.path = output.to_string_lossy().to_string();
    }
    if cli.compress {
        config.compress.output = true;
    }
    if let Some(codec) = &cli.codec {
        config.compress.codec = Some(codec.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
}

/// Close what was written so a failed partition is inspectable. The ingest
/// error is still returned, with any close failure attached.
fn close_after_failure(output: &vcfshard::PartitionOutput, err: anyhow::Error) -> anyhow::Error {
    match output.close() {
        Ok(_) => err,
        Err(close_err) => err.context(format!(
            "Also failed to close partition output: {}",
            close_err
        )),
    }
}

fn ingest_all(
    inputs: &[PathBuf],
    separator: &str,
    output: &vcfshard::PartitionOutput,
) -> Result<IngestStats> {
    if inputs.is_empty() {
        return ingest::run(io::stdin().lock(), separator, output);
    }

    let mut total = IngestStats::default();
    for path in inputs {
        let file =
            File::open(path).with_context(|| format!("Failed to open input {}", path.display()))?;
        let stats = ingest::run(reader(file), separator, output)
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        info!(input = %path.display(), rows = stats.written, "Ingested input");
        total.read += stats.read;
        total.written += stats.written;
        total.skipped += stats.skipped;
    }
    Ok(total)
}

fn reader(file: File) -> impl BufRead {
    BufReader::with_capacity(1 << 20, file)
}
