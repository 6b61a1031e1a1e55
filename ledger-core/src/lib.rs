//! Balance Ledger Core
//!
//! Account balances derived from an append-only transaction log.
//!
//! # Architecture
//!
//! - **Genesis**: A static snapshot supplies the starting balances
//! - **Replay**: Every logged transaction is re-applied on startup
//! - **Buffering**: New transactions are applied in memory, then flushed
//! - **Single Writer**: One owner per log; callers serialize apply and flush
//!
//! # Invariants
//!
//! - No negative balances: a failing transaction changes nothing
//! - Deterministic replay: Same genesis + same log → same balances
//! - Append-only: Records are never modified or deleted
//! - Ordered: Apply order == buffer order == log order

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod genesis;
pub mod storage;
pub mod state;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Account, Balances, Transaction, REWARD_DATA};
pub use genesis::Genesis;
pub use storage::{FileLog, LogStore, MemoryLog};
pub use state::State;
pub use config::Config;
pub use metrics::Metrics;
