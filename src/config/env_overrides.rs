use super::{LogFormat, OutputMode, RuntimeConfig, StorageBackend};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "VCFSHARD_";

/// Abstraction over environment-variable lookups so embedders and tests can
/// supply their own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the `VCFSHARD_` prefix.
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Row layout
    if let Some(separator) = env.get("OUTPUT_SEPARATOR") {
        config.output.separator = unescape(&separator);
    }
    if let Some(mode) = env.get("OUTPUT_MODE") {
        config.output.mode = mode
            .parse::<OutputMode>()
            .context("Invalid VCFSHARD_OUTPUT_MODE value")?;
    }

    // Compression
    if let Some(val) = get_env_bool(env, "COMPRESS_OUTPUT")? {
        config.compress.output = val;
    }
    if let Some(codec) = env.get("COMPRESS_CODEC") {
        config.compress.codec = if codec.is_empty() { None } else { Some(codec) };
    }

    // Storage
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid VCFSHARD_STORAGE_BACKEND value")?;
    }
    if let Some(path) = env.get("STORAGE_PATH") {
        config.storage.path = path;
    }

    // Header
    if let Some(path) = env.get("HEADER_PATH") {
        config.header.path = if path.is_empty() { None } else { Some(path) };
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Shells make a literal tab awkward to pass; accept `\t` escapes.
fn unescape(value: &str) -> String {
    value.replace("\\t", "\t")
}
