//! Tunables of the overlay engine.
//!
//! Loaded from JSON; every field is optional and falls back to the value a
//! vanilla-sized claim outline needs.

use crate::cache::DEFAULT_CAPACITY;
use crate::logger::{log, LogSeverity::{Info, Warning}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};
use thiserror::Error;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "CLAIM_OVERLAY_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Half-width of the square window, in cells, scanned around an observer.
    pub horizontal_radius: u32,
    /// Cells rendered below the observer's feet.
    pub vertical_below: u32,
    /// Cells rendered above the observer's feet.
    pub vertical_above: u32,
    /// Cells the ownership cache remembers.
    pub cache_capacity: usize,
    /// Interval between two drains when using the bundled ticker.
    pub tick_interval_ms: u64,
    /// Widest accepted claim footprint on either horizontal axis.
    pub max_claim_span: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            horizontal_radius: 7,
            vertical_below: 5,
            vertical_above: 4,
            cache_capacity: DEFAULT_CAPACITY,
            tick_interval_ms: 50,
            max_claim_span: 100_000,
        }
    }
}

impl OverlayConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        OverlayConfig::from_json_str(&contents)
    }

    /// Reads the file named by `CLAIM_OVERLAY_CONFIG`, or the defaults when the
    /// variable is unset or the file cannot be loaded.
    pub fn from_env() -> Self {
        let Some(path) = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) else {
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(config) => {
                log(format!("Loaded overlay config from {}", path.display()), Info);
                config
            }
            Err(err) => {
                log(format!("{}, using defaults", err), Warning);
                Self::default()
            }
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse overlay config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read overlay config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
