//! Configuration types for the signal-watch service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag used when the config store has no `tags` entry.
pub const DEFAULT_TAG: &str = "ephem emro";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Background fetch-and-process loop settings.
    pub scheduler: SchedulerConfig,
    /// Log capture, file sink and filter settings.
    pub logging: LoggingConfig,
    /// HTTP control surface settings.
    pub server: ServerConfig,
}

/// Periodic workflow scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between workflow runs.
    pub interval_secs: u64,
    /// Seconds between cancellation checks while idle.
    ///
    /// Bounds how long `stop()` can take to end the background loop,
    /// independent of `interval_secs`.
    pub poll_quantum_secs: u64,
    /// Tags used when the config store has no usable `tags` value.
    pub default_tags: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            poll_quantum_secs: 60,
            default_tags: vec![DEFAULT_TAG.to_owned()],
        }
    }
}

/// How often the persistent log file is rolled over.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Single file, never rolled; `max_files` has no effect.
    Never,
    /// New file every minute.
    Minutely,
    /// New file every hour.
    Hourly,
    /// New file every day.
    #[default]
    Daily,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the in-memory capture buffer is installed.
    pub capture: bool,
    /// Maximum records held by the capture buffer.
    pub buffer_capacity: usize,
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for the persistent log file (None = no file sink).
    pub log_dir: Option<PathBuf>,
    /// File name prefix of the persistent log (e.g. `app` → `app.log`).
    pub file_prefix: String,
    /// File name suffix of the persistent log.
    pub file_suffix: String,
    /// Rollover cadence of the persistent log.
    pub rotation: LogRotation,
    /// Rolled files retained on disk.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            capture: true,
            buffer_capacity: 1000,
            level: "info".to_owned(),
            log_dir: Some(default_log_dir()),
            file_prefix: "app".to_owned(),
            file_suffix: "log".to_owned(),
            rotation: LogRotation::Daily,
            max_files: 5,
        }
    }
}

/// HTTP control surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port (0 = auto-assign).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("signal-watch")
        .join("logs")
}

impl WatchConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::WatchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::WatchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/signal-watch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/signal-watch-config"))
            .join("signal-watch")
            .join("config.toml")
    }
}
