//! Cleanup tool configuration.
//!
//! Defaults mirror the original management command: a 90-day horizon,
//! no dry-run, all categories. A TOML file can override them and the
//! CLI overrides the file.
//!
//! # Example
//!
//! ```toml
//! days = 30
//! dry_run = false
//! categories = ["job", "project_update"]
//!
//! [database]
//! path = "/var/lib/scour/history.db"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Category;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Retention horizon must be a positive number of days")]
    ZeroHorizon,
}

/// Tool configuration, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Retention horizon in days.
    /// Default: 90
    #[serde(default = "default_days")]
    pub days: u32,

    /// Classify and report without deleting anything.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Categories to clean up. Empty means all categories.
    #[serde(default)]
    pub categories: Vec<Category>,

    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            days: default_days(),
            dry_run: false,
            categories: Vec::new(),
            database: DatabaseConfig::default(),
        }
    }
}

fn default_days() -> u32 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the run-history SQLite database.
    /// Default: "history.db"
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("history.db")
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The horizon must be a positive day count; the upper bound is
    /// enforced by the cutoff computation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        Ok(())
    }
}
