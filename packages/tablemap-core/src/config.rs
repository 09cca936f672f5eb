//! Manager configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use crate::error::{OrmError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`crate::Manager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Store file path (default: None, an in-memory store)
    pub path: Option<PathBuf>,
    /// Maximum nesting of object references followed on read and write (default: 16)
    pub max_relation_depth: usize,
    /// Busy timeout handed to the store driver, in milliseconds (default: 5000)
    pub busy_timeout_ms: u64,
    /// Switch the store to WAL journaling on open (default: false)
    pub wal_journal: bool,
    /// Run VACUUM after `delete_all` (default: true)
    pub vacuum_after_delete_all: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_relation_depth: 16,
            busy_timeout_ms: 5000,
            wal_journal: false,
            vacuum_after_delete_all: true,
        }
    }
}

impl ManagerConfig {
    /// Creates a configuration for an in-memory store.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a configuration for a store file at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| OrmError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| OrmError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Saves the configuration to a TOML file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| OrmError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), toml)
            .map_err(|e| OrmError::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Applies environment variable overrides.
    /// Environment variables are prefixed with `TABLEMAP_`.
    /// Example: `TABLEMAP_PATH=/data/app.sqlite` overrides `path`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("TABLEMAP_PATH") {
            self.path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
        if let Ok(val) = env::var("TABLEMAP_MAX_RELATION_DEPTH") {
            self.max_relation_depth = val.parse().map_err(|_| {
                OrmError::Config(format!("Invalid max_relation_depth: {}", val))
            })?;
        }
        if let Ok(val) = env::var("TABLEMAP_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = val
                .parse()
                .map_err(|_| OrmError::Config(format!("Invalid busy_timeout_ms: {}", val)))?;
        }
        if let Ok(val) = env::var("TABLEMAP_WAL_JOURNAL") {
            self.wal_journal = val
                .parse()
                .map_err(|_| OrmError::Config(format!("Invalid wal_journal: {}", val)))?;
        }
        if let Ok(val) = env::var("TABLEMAP_VACUUM_AFTER_DELETE_ALL") {
            self.vacuum_after_delete_all = val.parse().map_err(|_| {
                OrmError::Config(format!("Invalid vacuum_after_delete_all: {}", val))
            })?;
        }
        Ok(())
    }

    /// Returns the busy timeout as a `Duration`.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
