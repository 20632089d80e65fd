//! Configuration management for flightsearch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightsearch";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flight_search.db";

/// Upper bound for the search debounce.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTSEARCH_`, `__` between levels)
/// 2. TOML config file at `~/.config/flightsearch/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Search configuration.
    pub search: SearchConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightsearch/flight_search.db`
    pub database_path: Option<PathBuf>,
    /// Pre-populated database copied into place when no database exists yet.
    pub seed_path: Option<PathBuf>,
}

/// Search-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search runs.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTSEARCH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.search.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "debounce_ms ({}) cannot be greater than {MAX_DEBOUNCE_MS}",
                    self.search.debounce_ms
                ),
            });
        }

        if let Some(seed) = &self.storage.seed_path {
            if !seed.is_file() {
                return Err(Error::ConfigValidation {
                    message: format!("seed_path {} does not exist", seed.display()),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the search debounce as a Duration.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert!(config.storage.seed_path.is_none());
        assert_eq!(config.search.debounce_ms, 300);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_debounce_too_long() {
        let mut config = Config::default();
        config.search.debounce_ms = MAX_DEBOUNCE_MS + 1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("debounce_ms"));
    }

    #[test]
    fn test_validate_zero_debounce_allowed() {
        let mut config = Config::default();
        config.search.debounce_ms = 0;
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce(), Duration::ZERO);
    }

    #[test]
    fn test_validate_missing_seed() {
        let mut config = Config::default();
        config.storage.seed_path = Some(PathBuf::from("/nonexistent/flight_search.db"));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("seed_path"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("flight_search.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_debounce() {
        assert_eq!(Config::default().debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flightsearch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "flightsearch_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[storage]\ndatabase_path = \"/tmp/airports.db\"\n\n[search]\ndebounce_ms = 50\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/airports.db"));
        assert_eq!(config.search.debounce_ms, 50);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_search_config_deserialize() {
        let json = r#"{"debounce_ms": 120}"#;
        let search: SearchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(search.debounce_ms, 120);
    }

    #[test]
    fn test_storage_config_serialize() {
        let json = serde_json::to_string(&StorageConfig::default()).unwrap();
        assert!(json.contains("database_path"));
        assert!(json.contains("seed_path"));
    }
}
