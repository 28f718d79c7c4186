//! Database configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/scrawl/config.toml)
//! 3. Environment variables (SCRAWL_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "SCRAWL";

/// How reads relate to concurrent writes on the same document path
///
/// The store's historical behavior is lock-free reads: a read racing a
/// write on the same path may observe a mid-creation directory or a
/// just-deleted document. `Serialized` makes reads and listings take the
/// same per-path lock writers use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadConsistency {
    /// Reads never take the path lock (default)
    #[default]
    Unlocked,
    /// Reads and listings are serialized against writes on the same path
    Serialized,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the document tree lives under
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Read consistency mode
    #[serde(default)]
    pub read_consistency: ReadConsistency,

    /// Whether to remove orphaned `.tmp` files when the database opens
    #[serde(default)]
    pub sweep_on_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            read_consistency: ReadConsistency::Unlocked,
            sweep_on_open: false,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (SCRAWL_DATA_DIR, SCRAWL_READ_CONSISTENCY,
    ///    SCRAWL_SWEEP_ON_OPEN)
    /// 2. Config file (~/.config/scrawl/config.toml or SCRAWL_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // SCRAWL_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // SCRAWL_READ_CONSISTENCY (unknown values are ignored)
        if let Ok(val) = std::env::var(format!("{}_READ_CONSISTENCY", ENV_PREFIX)) {
            match val.to_ascii_lowercase().as_str() {
                "serialized" => self.read_consistency = ReadConsistency::Serialized,
                "unlocked" => self.read_consistency = ReadConsistency::Unlocked,
                _ => {}
            }
        }

        // SCRAWL_SWEEP_ON_OPEN
        if let Ok(val) = std::env::var(format!("{}_SWEEP_ON_OPEN", ENV_PREFIX)) {
            self.sweep_on_open = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with SCRAWL_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scrawl")
            .join("config.toml")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scrawl")
}
