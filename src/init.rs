// Initialization utilities
//
// Partition output setup and logging/tracing setup

use std::sync::Arc;

use crate::config::{LogFormat, RuntimeConfig, StorageBackend};
use crate::writer::{initialize_storage, OutputSettings, PartitionOutput, Progress};
use anyhow::{Context, Result};
use tracing::info;

/// Build the writer set for one partition from RuntimeConfig.
///
/// Storage and codec problems surface here, before any record is written.
pub fn init_output(
    config: &RuntimeConfig,
    partition: &str,
    progress: Arc<dyn Progress>,
) -> Result<PartitionOutput> {
    match config.storage.backend {
        StorageBackend::Fs => info!("Using filesystem storage at: {}", config.storage.path),
        StorageBackend::Memory => info!("Using in-memory storage"),
    }

    let factory = initialize_storage(config).context("Failed to initialize storage")?;
    let settings =
        OutputSettings::from_config(config).context("Failed to resolve output settings")?;

    info!(
        partition,
        codec = settings.codec.map(|c| c.name()).unwrap_or("none"),
        "Initialized partition output"
    );
    Ok(PartitionOutput::new(partition, factory, settings, progress))
}

/// Initialize tracing/logging from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr; stdout is left to the job. Setting the global
    // subscriber twice is ignored.
    let _ = match config.log.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
    };
}
