//! Error types for the balance ledger

use crate::types::Account;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Genesis snapshot missing or malformed
    #[error("Genesis load error: {0}")]
    Load(String),

    /// Transaction log could not be opened or read
    #[error("Initialization error: {0}")]
    Init(String),

    /// Log record could not be decoded during replay
    #[error("Decode error at record {record}: {source}")]
    Decode {
        /// 1-based record number in the log
        record: usize,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Decoded log record could not be applied during replay
    #[error("Replay failed at record {record}: {source}")]
    Replay {
        /// 1-based record number in the log
        record: usize,
        /// Validation failure raised by the record
        #[source]
        source: Box<Error>,
    },

    /// Sender cannot cover the transfer
    #[error("Insufficient balance: {account} has {balance}, needs {required}")]
    InsufficientBalance {
        /// Debited account
        account: Account,
        /// Balance at the time of the attempt
        balance: u64,
        /// Transfer value
        required: u64,
    },

    /// Credit would push a balance past `u64::MAX`
    #[error("Balance overflow crediting {account}")]
    BalanceOverflow {
        /// Credited account
        account: Account,
    },

    /// Flush could not write every buffered transaction
    #[error("Persist error: {reason} ({pending} transaction(s) still pending)")]
    Persist {
        /// Underlying failure
        reason: String,
        /// Entries left in the buffer
        pending: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a recoverable validation failure.
    ///
    /// Validation failures leave the state untouched; the caller may retry
    /// with a different transaction. Everything else is fatal to the
    /// operation that raised it.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InsufficientBalance { .. } | Error::BalanceOverflow { .. }
        )
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
