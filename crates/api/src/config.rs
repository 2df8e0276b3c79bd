//! Server configuration

use batch_ingest::IngestConfig;
use serde::{Deserialize, Serialize};

/// Default configuration file, optional
pub const DEFAULT_CONFIG_FILE: &str = "config/criticality.toml";

/// Environment variable prefix; nested keys use `__`, e.g.
/// `CRITICALITY__SERVER__BIND_ADDR`
pub const ENV_PREFIX: &str = "CRITICALITY";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Statistical model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Fixed location probed once at startup
    pub path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "ml_models/criticality-model.onnx".to_string(),
        }
    }
}

/// Persistence backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL, or `memory` for the in-memory repository
    pub database_url: String,
    /// Create the import batch table
    pub batch_tracking: bool,
}

impl StorageConfig {
    pub fn is_in_memory_repository(&self) -> bool {
        self.database_url == "memory"
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            batch_tracking: true,
        }
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Newline-delimited JSON instead of human-readable lines
    pub json: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file, overridden by `CRITICALITY__*`
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let path = path.unwrap_or(DEFAULT_CONFIG_FILE);
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
