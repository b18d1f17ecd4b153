//! Client configuration
//!
//! Read from `rondo.toml` in the platform config directory. Every field
//! has a default, so a missing file or an empty table still yields a
//! working configuration.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not determine a data directory for this platform")]
    NoProjectDirs,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file; defaults to `rondo.db` under the platform data
    /// directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Prefix applied to every collection name, for deployments that
    /// share one database between apps (e.g. `"pickupSoccer_"`).
    #[serde(default)]
    pub collection_prefix: String,
}

/// `[analytics]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// When false, every event is dropped before reaching the sink.
    #[serde(default = "default_analytics_enabled")]
    pub enabled: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_analytics_enabled(),
        }
    }
}

fn default_analytics_enabled() -> bool {
    true
}

/// Collection names with the configured prefix applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub games: String,
    pub groups: String,
    pub players: String,
}

impl CollectionNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            games: format!("{prefix}games"),
            groups: format!("{prefix}groups"),
            players: format!("{prefix}players"),
        }
    }
}

impl ClientConfig {
    /// Load from the default platform location. A missing file is not
    /// an error; defaults apply.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse directly from TOML content (for testing)
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Collection names under the configured prefix.
    pub fn collections(&self) -> CollectionNames {
        CollectionNames::with_prefix(&self.store.collection_prefix)
    }

    /// Path of the database file to open.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let dirs = ProjectDirs::from("dev", "rondo", "rondo").ok_or(ConfigError::NoProjectDirs)?;
        Ok(dirs.data_dir().join("rondo.db"))
    }

    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("dev", "rondo", "rondo").ok_or(ConfigError::NoProjectDirs)?;
        Ok(dirs.config_dir().join("rondo.toml"))
    }
}
