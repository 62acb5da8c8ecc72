//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments / environment variables (see [`ConfigOverrides`])
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing config file is not fatal: compiled defaults are used and the
//! caller is told so through [`ConfigSource::Defaults`]. A config file that
//! exists but cannot be parsed is fatal.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default model artifact location (relative to the working directory)
pub const DEFAULT_MODEL_PATH: &str = "model/revenue_model.json";

/// Default ceiling for bulk upload payloads: 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Accepted log levels
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Bootstrap configuration loaded from TOML
///
/// These settings cannot change during runtime. The service must restart
/// to pick up changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Model artifact settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Path to the serialized model artifact
    pub path: PathBuf,

    /// When false, a model that fails to load leaves the service running in
    /// degraded mode (health reports `model_loaded: false`, predictions fail)
    pub require_loaded: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            require_loaded: true,
        }
    }
}

/// Per-request resource ceilings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted bulk upload, in bytes
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the effective configuration was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No config file exists; compiled defaults in effect
    Defaults,
}

/// Values supplied on the command line or through `REVPRED_*` environment
/// variables. `None` leaves the TOML/default value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_path: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it
    ///
    /// An explicit path must exist. Without one, the platform search paths are
    /// tried in order and compiled defaults are used when none exists. The
    /// returned [`ConfigSource`] lets the caller log the outcome once logging
    /// is up (the log level itself comes from this config).
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            let config = Self::load(path)?;
            return Ok((config, ConfigSource::File(path.to_path_buf())));
        }

        match config_search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Apply command-line / environment overrides on top of this config
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(path) = overrides.model_path {
            self.model.path = path;
        }
        if let Some(max) = overrides.max_upload_bytes {
            self.limits.max_upload_bytes = max;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be greater than 0".to_string()));
        }
        if self.server.host.trim().is_empty() {
            return Err(Error::Config("server.host must not be empty".to_string()));
        }
        if self.limits.max_upload_bytes == 0 {
            return Err(Error::Config(
                "limits.max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::Config(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        Ok(())
    }

    /// `host:port` string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Config file locations searched when no explicit path is given
///
/// Linux: `~/.config/revpred/config.toml`, then `/etc/revpred/config.toml`.
/// Other platforms: the user config directory only.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("revpred").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/revpred/config.toml"));
    }
    paths
}
