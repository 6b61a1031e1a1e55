//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Genesis file name inside a data directory
pub const GENESIS_FILE: &str = "genesis.json";

/// Transaction log file name inside a data directory
pub const TX_LOG_FILE: &str = "tx.db";

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Genesis snapshot (JSON)
    pub genesis_path: PathBuf,

    /// Append-only transaction log
    pub tx_log_path: PathBuf,

    /// Create an empty log on first start instead of failing
    pub create_log_if_missing: bool,

    /// fsync the log after every successful flush
    pub sync_on_flush: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_data_dir("./database")
    }
}

impl Config {
    /// Standard file layout under `data_dir`
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            genesis_path: data_dir.join(GENESIS_FILE),
            tx_log_path: data_dir.join(TX_LOG_FILE),
            create_log_if_missing: true,
            sync_on_flush: true,
        }
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    ///
    /// `LEDGER_DATA_DIR` picks the layout; `LEDGER_GENESIS_PATH` and
    /// `LEDGER_TX_LOG_PATH` override single files.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = match var("LEDGER_DATA_DIR") {
            Some(dir) if dir.is_empty() => {
                return Err(crate::Error::Config("LEDGER_DATA_DIR is empty".to_string()))
            }
            Some(dir) => Config::for_data_dir(dir),
            None => Config::default(),
        };

        if let Some(path) = var("LEDGER_GENESIS_PATH") {
            config.genesis_path = PathBuf::from(path);
        }

        if let Some(path) = var("LEDGER_TX_LOG_PATH") {
            config.tx_log_path = PathBuf::from(path);
        }

        Ok(config)
    }
}
