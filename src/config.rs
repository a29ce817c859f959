use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RecordFoldError, RecordFoldResult};

pub const CONFIG_PATH_ENV: &str = "RECORDFOLD_CONFIG";
pub const STORAGE_PATH_ENV: &str = "RECORDFOLD_STORAGE_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/recordfold.json";

/// Configuration for the sled-backed record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory where sled keeps its files
    pub storage_path: PathBuf,
    /// Delete the database when it is dropped (tests, scratch runs)
    #[serde(default)]
    pub temporary: bool,
    /// Flush to disk after every write
    #[serde(default = "default_flush_on_write")]
    pub flush_on_write: bool,
    /// Maximum level passed to the logger
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of log lines kept in memory
    #[serde(default = "default_recent_log_capacity")]
    pub recent_log_capacity: usize,
}

fn default_flush_on_write() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_recent_log_capacity() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data"),
            temporary: false,
            flush_on_write: default_flush_on_write(),
            log_level: default_log_level(),
            recent_log_capacity: default_recent_log_capacity(),
        }
    }
}

impl StoreConfig {
    pub fn new(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            ..Default::default()
        }
    }

    /// A throwaway database rooted at `storage_path`.
    pub fn temporary(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            temporary: true,
            flush_on_write: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> RecordFoldResult<()> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(RecordFoldError::Config("storage_path must not be empty".into()));
        }
        if self.recent_log_capacity == 0 {
            return Err(RecordFoldError::Config(
                "recent_log_capacity must be greater than zero".into(),
            ));
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn log_level_filter(&self) -> RecordFoldResult<log::LevelFilter> {
        self.log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| RecordFoldError::Config(format!("unknown log level '{}'", self.log_level)))
    }
}

/// Load the store configuration.
///
/// Resolution order for the file: `path`, then `RECORDFOLD_CONFIG`, then
/// `config/recordfold.json`. A missing file yields defaults. `RECORDFOLD_STORAGE_PATH`
/// overrides the storage path either way.
pub fn load_store_config(path: Option<&str>) -> RecordFoldResult<StoreConfig> {
    let config_path = path
        .map(|p| p.to_string())
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = match std::fs::read_to_string(&config_path) {
        Ok(config_str) => serde_json::from_str::<StoreConfig>(&config_str).map_err(|e| {
            log::error!("Failed to parse store configuration {}: {}", config_path, e);
            RecordFoldError::Config(format!("{}: {}", config_path, e))
        })?,
        Err(_) => {
            log::info!("No config at {}, using defaults", config_path);
            StoreConfig::default()
        }
    };

    if let Ok(storage_path) = std::env::var(STORAGE_PATH_ENV) {
        config.storage_path = PathBuf::from(storage_path);
    }

    config.validate()?;
    Ok(config)
}
