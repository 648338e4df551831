//! Configuration file parser for ~/.config/urlfeed/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each one
//! since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::storage::StoreOptions;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file. Defaults to `urlfeed.db` in the config directory.
    pub database_path: Option<PathBuf>,

    /// Upper bound on pooled SQLite connections.
    pub max_connections: u32,

    /// Seconds to wait for a free pooled connection.
    pub acquire_timeout_secs: u64,

    /// Milliseconds SQLite waits on a locked database.
    pub busy_timeout_ms: u64,

    /// Recorded as `meta_info.added_by` on insert unless `--added-by` is given.
    pub added_by: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let store = StoreOptions::default();
        Self {
            database_path: None,
            max_connections: store.max_connections,
            acquire_timeout_secs: store.acquire_timeout.as_secs(),
            busy_timeout_ms: store.busy_timeout.as_millis() as u64,
            added_by: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "database_path",
        "max_connections",
        "acquire_timeout_secs",
        "busy_timeout_ms",
        "added_by",
    ];

    /// Load configuration from a TOML file.
    ///
    /// A missing or blank file yields `Config::default()`. Unknown keys are
    /// accepted and logged as warnings.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = read_bounded(path, Self::MAX_FILE_SIZE)? else {
            tracing::debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        };

        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration text. Blank input yields the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let table: toml::Table = content.parse()?;
        for key in table
            .keys()
            .filter(|key| !Self::KNOWN_KEYS.contains(&key.as_str()))
        {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }

        Ok(Config::deserialize(toml::Value::Table(table))?)
    }

    /// Pool settings for [`crate::storage::Database::open_with`].
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_connections: self.max_connections.max(1),
            // A zero acquire timeout fails every pooled call immediately
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs.max(1)),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    /// Database path from config, or `urlfeed.db` inside `config_dir`.
    pub fn database_path_or(&self, config_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| config_dir.join("urlfeed.db"))
    }
}

/// Read `path` when it exists, refusing files larger than `limit` bytes.
///
/// `Ok(None)` means there is no file, including one removed between the size
/// check and the read.
fn read_bounded(path: &Path, limit: u64) -> Result<Option<String>, ConfigError> {
    let len = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > limit {
        return Err(ConfigError::TooLarge(format!(
            "Config file is {len} bytes (max {limit} bytes)"
        )));
    }

    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
