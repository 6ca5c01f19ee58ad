//! Service configuration
//!
//! Layered from built-in defaults, an optional TOML file and `MALARIA__*`
//! environment variables (e.g. `MALARIA__MODEL__ARTIFACT_PATH`).

use anyhow::{ensure, Context};
use config::{Config, Environment, File};
use inference_engine::LabelPolicy;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "MALARIA_CONFIG";

/// Config file used when `MALARIA_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "malaria.toml";

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "MALARIA";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
    /// Directory with the upload page, served for unmatched GET paths
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            static_dir: None,
        }
    }
}

/// Model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX artifact path
    pub artifact_path: PathBuf,
    /// Abort startup when the artifact cannot be loaded
    pub require_model: bool,
    /// Score-to-label mapping
    pub labels: LabelPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("malaria-cell-cnn.onnx"),
            require_model: false,
            labels: LabelPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServiceConfig {
    /// Load from the file named by `MALARIA_CONFIG` (or `malaria.toml`) plus environment
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file; a missing file is not an error
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config: ServiceConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("reading configuration from {}", path))?
            .try_deserialize()
            .context("parsing configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.model.labels.is_valid(),
            "model.labels.above_threshold and model.labels.otherwise must differ"
        );
        ensure!(self.server.max_upload_bytes > 0, "server.max_upload_bytes must be positive");
        self.logging
            .level
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("unknown logging.level {:?}", self.logging.level))?;
        Ok(())
    }
}
