//! Data directory resolution and the optional `config.toml`.
//!
//! ```toml
//! [report]
//! low_threshold = 60.0
//! fair_threshold = 80.0
//!
//! [store]
//! busy_timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use roll_core::BandThresholds;
use serde::Deserialize;

use crate::error::{Result, StoreError};
use crate::schema::DEFAULT_BUSY_TIMEOUT_MS;

pub const DATA_DIR_ENV: &str = "ROLL_DATA_DIR";
pub const DB_FILE: &str = "rollcall.db";
pub const CONFIG_FILE: &str = "config.toml";

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// `--data-dir`, then `ROLL_DATA_DIR`, then `~/.rollcall`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => home_dir().join(".rollcall"),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub report: ReportConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub low_threshold: f64,
    pub fair_threshold: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let bands = BandThresholds::default();
        Self {
            low_threshold: bands.low,
            fair_threshold: bands.fair,
        }
    }
}

impl ReportConfig {
    pub fn bands(&self) -> BandThresholds {
        BandThresholds {
            low: self.low_threshold,
            fair: self.fair_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub busy_timeout_ms: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load `<data_dir>/config.toml`. A missing file yields the defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| StoreError::Config { path, source })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let dir = resolve_data_dir(Some(Path::new("/tmp/roll-explicit")));
        assert_eq!(dir, PathBuf::from("/tmp/roll-explicit"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse("[report]\nlow_threshold = 50.0\n").unwrap();
        assert_eq!(config.report.low_threshold, 50.0);
        assert_eq!(config.report.fair_threshold, 80.0);
        assert_eq!(config.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[report\nlow_threshold = ").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Config { .. }), "got {err}");
    }

    #[test]
    fn test_bands_from_config() {
        let config = Config::parse("[report]\nlow_threshold = 40.0\nfair_threshold = 70.0\n").unwrap();
        let bands = config.report.bands();
        assert_eq!(bands.low, 40.0);
        assert_eq!(bands.fair, 70.0);
    }
}
