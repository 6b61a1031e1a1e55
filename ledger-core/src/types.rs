//! Core types for the ledger
//!
//! All types are designed for:
//! - Line-oriented JSON serialization (one transaction per log record)
//! - Exact arithmetic (unsigned integer balances)
//! - Value semantics (transactions are never mutated once built)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Annotation marking a transaction as a reward that mints new value.
pub const REWARD_DATA: &str = "reward";

/// Balance table: account to non-negative balance, ordered by account.
pub type Balances = BTreeMap<Account, u64>;

/// Account identifier
///
/// Opaque; two accounts are the same only if their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Create new account
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Account {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Account {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Value transfer between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Debited account (ignored for rewards)
    pub from: Account,

    /// Credited account
    pub to: Account,

    /// Amount moved
    pub value: u64,

    /// Free-form annotation; `"reward"` marks a mint
    #[serde(default)]
    pub data: String,
}

impl Transaction {
    /// Create new transaction
    pub fn new(
        from: impl Into<Account>,
        to: impl Into<Account>,
        value: u64,
        data: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            value,
            data: data.into(),
        }
    }

    /// Create a reward crediting `to` with freshly minted value.
    ///
    /// The sender is recorded as `to` itself; it is never debited.
    pub fn reward(to: impl Into<Account>, value: u64) -> Self {
        let to = to.into();
        Self {
            from: to.clone(),
            to,
            value,
            data: REWARD_DATA.to_string(),
        }
    }

    /// Whether this transaction mints value instead of moving it
    pub fn is_reward(&self) -> bool {
        self.data == REWARD_DATA
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reward() {
            write!(f, "reward {} -> {}", self.value, self.to)
        } else {
            write!(f, "{} -[{}]-> {}", self.from, self.value, self.to)
        }
    }
}
