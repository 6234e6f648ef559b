//! SchedClient configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduling-service connection
    pub service: ServiceConfig,

    /// Client-side storage paths
    pub storage: StorageConfig,

    /// Log level when not given on the command line
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear messages.
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(eyre::eyre!("service base-url must not be empty"));
        }
        if self.service.timeout_ms == 0 {
            return Err(eyre::eyre!("service timeout-ms must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .schedclient.yml
        let local_config = PathBuf::from(".schedclient.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/schedclient/schedclient.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("schedclient").join("schedclient.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level from config, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Scheduling-service connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    ///
    /// Applies to every call; a hung service surfaces as a normal
    /// transition failure instead of blocking forever.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Client-side storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the preference blob (shared with the `pf` tool)
    #[serde(rename = "preferences-path")]
    pub preferences_path: PathBuf,

    /// Default destination for exported calendar files
    #[serde(rename = "export-path")]
    pub export_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let preferences_path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("schedclient")
            .join("preferences.json");

        Self {
            preferences_path,
            export_path: PathBuf::from("schedule.ics"),
        }
    }
}
