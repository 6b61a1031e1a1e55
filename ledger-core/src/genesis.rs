//! Genesis snapshot loading
//!
//! The genesis file is a JSON document supplied from outside the ledger:
//!
//! ```json
//! { "genesis_time": "2019-03-18T00:00:00Z", "chain_id": "the-ledger",
//!   "balances": { "alice": 1000000 } }
//! ```
//!
//! Only `balances` is required. It is read once at startup.

use crate::{
    error::{Error, Result},
    types::{Account, Balances},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial balance snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Creation time as written by whoever produced the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<String>,

    /// Network identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,

    /// Starting balance per account
    pub balances: Balances,
}

impl Genesis {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Load(format!("failed to read {}: {}", path.display(), e)))?;
        let genesis: Genesis = serde_json::from_str(&content)
            .map_err(|e| Error::Load(format!("malformed genesis {}: {}", path.display(), e)))?;

        tracing::info!(
            path = %path.display(),
            accounts = genesis.balances.len(),
            chain_id = genesis.chain_id.as_deref().unwrap_or("-"),
            "Genesis loaded"
        );

        Ok(genesis)
    }

    /// Parse from a JSON document
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Load(format!("malformed genesis: {}", e)))
    }

    /// Build from explicit balances
    pub fn from_balances(balances: impl IntoIterator<Item = (Account, u64)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Hand the balances over to a new owner
    pub fn into_balances(self) -> Balances {
        self.balances
    }
}
