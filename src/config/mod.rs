// vcfshard configuration
//
// Supports configuration from multiple sources:
// 1. Command-line flags (highest priority, applied by the binary)
// 2. Environment variables (VCFSHARD_* prefix)
// 3. Config file path from --config or VCFSHARD_CONFIG
// 4. Config file contents from VCFSHARD_CONFIG_CONTENT
// 5. Default config file locations (./vcfshard.toml, ./.vcfshard.toml)
// 6. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub compress: CompressConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub header: HeaderConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Row layout (`output.*`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Key/value separator, used by the delimited row mode and by ingest.
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub mode: OutputMode,
}

fn default_separator() -> String {
    "\t".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            mode: OutputMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Rows are the record value only.
    #[default]
    Value,
    /// Rows are `key<separator>value`.
    Delimited,
}

impl std::str::FromStr for OutputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "value" => Ok(OutputMode::Value),
            "delimited" | "key-value" => Ok(OutputMode::Delimited),
            _ => anyhow::bail!("Unsupported output mode: {}. Supported: value, delimited", s),
        }
    }
}

/// Compression (`compress.*`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressConfig {
    #[serde(default)]
    pub output: bool,
    /// Codec name; gzip when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "./output".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => anyhow::bail!("Unsupported storage backend: {}. Supported: fs, memory", s),
        }
    }
}

/// Header block source (`header.*`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// File holding the `##` header lines; the built-in header when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Logging (`log.*`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from default file locations and the environment.
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse TOML content on top of the defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config content")
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
