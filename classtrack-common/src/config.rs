//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (handled by the binary's clap layer)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level TOML configuration (`classtrack.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub webhook: WebhookConfig,
    pub monitor: MonitorConfig,
    pub attendance: AttendanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the meeting-provider REST API
    pub base_url: String,
    /// Bearer token for the provider API, if it requires one
    pub api_token: Option<String>,
    /// Per-request timeout; an unresponsive provider must not stall the
    /// scheduler beyond this bound
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret expected in the X-Webhook-Secret header
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Class lifecycle sweep interval (scheduled -> active -> completed)
    pub class_interval_secs: u64,
    /// Participant fetch interval for active sessions
    pub fetch_interval_secs: u64,
    /// Retry interval for completed sessions with no attendance data
    pub retry_interval_secs: u64,
    /// How far back the retry pass looks for empty completed sessions
    pub retry_window_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Reconnect gaps up to this many minutes are stitched into one span
    pub max_gap_minutes: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            provider: ProviderConfig::default(),
            webhook: WebhookConfig::default(),
            monitor: MonitorConfig::default(),
            attendance: AttendanceConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("classtrack.db"),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5810".to_string(),
            api_token: None,
            timeout_secs: 10,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret: None }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            class_interval_secs: 120,
            fetch_interval_secs: 180,
            retry_interval_secs: 600,
            retry_window_days: 7,
        }
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self { max_gap_minutes: 5.0 }
    }
}

impl Config {
    /// Load configuration, resolving the file location if none is given
    ///
    /// A missing config file is not an error: defaults apply, and environment
    /// overrides are still honored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                tracing::info!("Loading configuration from {}", p.display());
                Self::from_file(p)?
            }
            None => match default_config_path() {
                Some(p) if p.exists() => {
                    tracing::info!("Loading configuration from {}", p.display());
                    Self::from_file(&p)?
                }
                _ => {
                    tracing::debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides on top of file/default values
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CLASSTRACK_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("CLASSTRACK_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Ok(token) = std::env::var("CLASSTRACK_PROVIDER_TOKEN") {
            self.provider.api_token = Some(token);
        }
        if let Ok(secret) = std::env::var("CLASSTRACK_WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret);
        }
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("classtrack").join("classtrack.toml"))
}

/// Default data directory for the platform
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("classtrack"))
        .unwrap_or_else(|| PathBuf::from("./classtrack_data"))
}
