// Configuration source loading.
//
// Priority order:
// 1. Environment variables (VCFSHARD_* prefix)
// 2. Config file path from VCFSHARD_CONFIG
// 3. Inline config content from VCFSHARD_CONFIG_CONTENT
// 4. Default config files (./vcfshard.toml, ./.vcfshard.toml)
// 5. Built-in defaults

use super::env_overrides::{self, EnvSource, ENV_PREFIX};
use super::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = load_from_file()?.unwrap_or_default();

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("VCFSHARD_CONFIG") {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("VCFSHARD_CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from VCFSHARD_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in &["./vcfshard.toml", "./.vcfshard.toml"] {
        let path = Path::new(path);
        if path.exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_file(path.as_ref())?;

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_file_parses_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vcfshard.toml");
        std::fs::write(
            &path,
            "[compress]\noutput = true\ncodec = \"deflate\"\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = read_file(&path).unwrap();
        assert!(config.compress.output);
        assert_eq!(config.compress.codec.as_deref(), Some("deflate"));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.output.separator, "\t");
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = read_file(Path::new("/nonexistent/vcfshard.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
