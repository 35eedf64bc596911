//! Runtime configuration.
//!
//! Stored as pretty-printed JSON (`config.json` inside the data directory).
//! A missing file means defaults; unknown fields are ignored so older
//! binaries can read newer files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// File name of the configuration inside a data directory.
pub const CONFIG_FILE: &str = "config.json";

const CONFIG_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// What vertex creation does when the index write fails after the vertex
/// insert succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFailurePolicy {
    /// Roll the vertex insert back and report that no vertex was produced.
    #[default]
    Rollback,
    /// Compatibility mode: return the vertex id without committing or
    /// rolling back. The caller may hold an id for a vertex that never
    /// becomes visible.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    /// Number of graph handles in the pool.
    pub pool_size: usize,
    pub index_failure: IndexFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            pool_size: 4,
            index_failure: IndexFailurePolicy::Rollback,
        }
    }
}

impl Config {
    /// Loads the configuration stored in `dir`, or defaults if there is none.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config: Config = serde_json::from_str(&fs::read_to_string(&path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration into `dir`, creating the directory if needed.
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        fs::create_dir_all(dir)?;
        fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".into()));
        }
        Ok(())
    }
}
