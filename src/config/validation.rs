// Configuration validation
//
// Rejects settings that would fail later at writer creation, and warns about
// settings that are legal but probably unintended.

use super::*;
use crate::codec::Codec;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_output_config(&config.output)?;
    validate_compress_config(&config.compress)?;
    validate_storage_config(&config.storage)?;
    validate_log_config(&config.log)?;
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<()> {
    if config.separator.is_empty() {
        bail!("output.separator must not be empty");
    }
    if config.separator.contains('\n') {
        bail!("output.separator must not contain a newline");
    }
    Ok(())
}

fn validate_compress_config(config: &CompressConfig) -> Result<()> {
    match (&config.codec, config.output) {
        (Some(codec), true) => {
            Codec::resolve(Some(codec.as_str()))?;
        }
        (Some(codec), false) => {
            warn!(
                codec = %codec,
                "compress.codec is set but compress.output is false; output is uncompressed"
            );
        }
        (None, _) => {}
    }
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.backend == StorageBackend::Fs && config.path.is_empty() {
        bail!(
            "Filesystem path is required\n\n\
            How to fix:\n\
              • Environment: export {}STORAGE_PATH=/data/vcf\n\
              • TOML: [storage]\n              path = \"/data/vcf\"\n\
              • CLI: --output /data/vcf",
            ENV_PREFIX
        );
    }
    Ok(())
}

fn validate_log_config(config: &LogConfig) -> Result<()> {
    if tracing_subscriber::EnvFilter::try_new(&config.level).is_err() {
        bail!("log.level '{}' is not a valid filter directive", config.level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_output_config() {
        assert!(validate_output_config(&OutputConfig::default()).is_ok());

        let empty = OutputConfig {
            separator: String::new(),
            mode: OutputMode::Delimited,
        };
        assert!(validate_output_config(&empty).is_err());
    }

    #[test]
    fn test_validate_compress_config() {
        let valid = CompressConfig {
            output: true,
            codec: Some("gzip".to_string()),
        };
        assert!(validate_compress_config(&valid).is_ok());

        let unknown = CompressConfig {
            output: true,
            codec: Some("snappy".to_string()),
        };
        assert!(validate_compress_config(&unknown).is_err());

        // Unused codec only warns.
        let unused = CompressConfig {
            output: false,
            codec: Some("snappy".to_string()),
        };
        assert!(validate_compress_config(&unused).is_ok());
    }

    #[test]
    fn test_validate_storage_config() {
        let empty_fs = StorageConfig {
            backend: StorageBackend::Fs,
            path: String::new(),
        };
        assert!(validate_storage_config(&empty_fs).is_err());

        let memory = StorageConfig {
            backend: StorageBackend::Memory,
            path: String::new(),
        };
        assert!(validate_storage_config(&memory).is_ok());
    }
}
