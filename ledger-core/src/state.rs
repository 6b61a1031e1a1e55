//! Ledger state engine
//!
//! Owns the live balance table, the buffer of applied-but-unflushed
//! transactions and the transaction log.
//!
//! # Lifecycle
//!
//! 1. [`State::open`] loads genesis, opens the log and replays every record
//! 2. [`State::apply`] validates a transaction, mutates balances and buffers it
//! 3. [`State::flush`] appends buffered transactions to the log, in order
//! 4. [`State::close`] syncs and releases the log
//!
//! # Invariants
//!
//! - Balances never go negative; a failing transaction mutates nothing
//! - Buffer order == apply order == log order
//! - Replaying the log over genesis reproduces the in-memory balances of
//!   every flushed transaction
//!
//! # Example
//!
//! ```no_run
//! use balance_ledger::{Config, State, Transaction};
//!
//! fn main() -> balance_ledger::Result<()> {
//!     let mut state = State::open(&Config::for_data_dir("./database"))?;
//!
//!     state.apply(Transaction::new("andrej", "babayaga", 2000, ""))?;
//!     state.flush()?;
//!
//!     state.close()
//! }
//! ```

use crate::{
    config::Config,
    error::{Error, Result},
    genesis::Genesis,
    metrics::Metrics,
    storage::{FileLog, LogStore},
    types::{Account, Balances, Transaction},
};
use std::time::Instant;

/// In-memory ledger state backed by an append-only log
#[derive(Debug)]
pub struct State<L: LogStore = FileLog> {
    /// Current balance per account
    balances: Balances,

    /// Applied transactions not yet in the log
    pending: Vec<Transaction>,

    /// Durable log, exclusively owned
    log: L,

    /// Records replayed at startup
    replayed: usize,

    /// fsync after each flush
    sync_on_flush: bool,

    metrics: Metrics,
}

impl State<FileLog> {
    /// Open ledger with configuration
    ///
    /// Loads genesis, opens the log at `config.tx_log_path` and replays it.
    /// On any failure the log handle is released before returning.
    pub fn open(config: &Config) -> Result<Self> {
        let genesis = Genesis::load(&config.genesis_path)?;

        let log = FileLog::open(&config.tx_log_path, config.create_log_if_missing).map_err(|e| {
            Error::Init(format!(
                "failed to open transaction log {}: {}",
                config.tx_log_path.display(),
                e
            ))
        })?;

        let state = Self::from_parts(genesis, log)?.with_sync_on_flush(config.sync_on_flush);

        tracing::info!(
            log = %config.tx_log_path.display(),
            accounts = state.balances.len(),
            replayed = state.replayed,
            "Ledger state opened"
        );

        Ok(state)
    }
}

impl<L: LogStore> State<L> {
    /// Rebuild state from genesis and an already opened log
    pub fn from_parts(genesis: Genesis, mut log: L) -> Result<Self> {
        let records = log
            .read_records()
            .map_err(|e| Error::Init(format!("failed to read transaction log: {}", e)))?;

        let mut state = Self {
            balances: genesis.into_balances(),
            pending: Vec::new(),
            log,
            replayed: 0,
            sync_on_flush: true,
            metrics: Metrics::new()?,
        };

        for (index, record) in records.iter().enumerate() {
            let number = index + 1;

            if record.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let tx: Transaction = serde_json::from_slice(record).map_err(|source| {
                tracing::error!(record = number, error = %source, "Malformed log record");
                Error::Decode {
                    record: number,
                    source,
                }
            })?;

            // Replayed transactions are already durable; they skip the buffer.
            state.apply_to_balances(&tx).map_err(|e| {
                tracing::error!(record = number, error = %e, "Log record contradicts balances");
                Error::Replay {
                    record: number,
                    source: Box::new(e),
                }
            })?;

            state.replayed += 1;
        }

        state.metrics.record_replayed(state.replayed);
        tracing::debug!(replayed = state.replayed, "Transaction log replayed");

        Ok(state)
    }

    /// Set whether flush fsyncs the log
    pub fn with_sync_on_flush(mut self, sync_on_flush: bool) -> Self {
        self.sync_on_flush = sync_on_flush;
        self
    }

    /// Validate and apply a transaction, then buffer it for the next flush
    ///
    /// Transfers fail with [`Error::InsufficientBalance`] when the sender
    /// cannot cover `value`. Rewards skip the sender check, but like transfers
    /// they fail with [`Error::BalanceOverflow`] when the credit would exceed
    /// `u64::MAX`. A failed transaction leaves balances and buffer untouched.
    pub fn apply(&mut self, tx: Transaction) -> Result<()> {
        if let Err(e) = self.apply_to_balances(&tx) {
            self.metrics.record_rejected();
            tracing::warn!(tx = %tx, error = %e, "Transaction rejected");
            return Err(e);
        }

        let minted = if tx.is_reward() { tx.value } else { 0 };
        tracing::debug!(tx = %tx, "Transaction applied");

        self.pending.push(tx);
        self.metrics.record_applied(minted, self.pending.len());

        Ok(())
    }

    /// Check and mutate balances as one step
    fn apply_to_balances(&mut self, tx: &Transaction) -> Result<()> {
        if tx.is_reward() {
            let credited = self
                .balance(&tx.to)
                .checked_add(tx.value)
                .ok_or_else(|| Error::BalanceOverflow {
                    account: tx.to.clone(),
                })?;
            self.balances.insert(tx.to.clone(), credited);
            return Ok(());
        }

        let sender = self.balance(&tx.from);
        if tx.value > sender {
            return Err(Error::InsufficientBalance {
                account: tx.from.clone(),
                balance: sender,
                required: tx.value,
            });
        }

        let debited = sender - tx.value;
        let receiver = if tx.to == tx.from {
            debited
        } else {
            self.balance(&tx.to)
        };
        let credited = receiver
            .checked_add(tx.value)
            .ok_or_else(|| Error::BalanceOverflow {
                account: tx.to.clone(),
            })?;

        self.balances.insert(tx.from.clone(), debited);
        self.balances.insert(tx.to.clone(), credited);

        Ok(())
    }

    /// Append every buffered transaction to the log, in apply order
    ///
    /// Returns the number of records written. On a failed write the records
    /// already written leave the buffer and the rest stay buffered, so a
    /// later flush resumes exactly where this one stopped.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let mut written = 0;
        let mut failure = None;

        for tx in &self.pending {
            let result = serde_json::to_vec(tx)
                .map_err(|e| e.to_string())
                .and_then(|record| self.log.append(&record).map_err(|e| e.to_string()));

            if let Err(reason) = result {
                failure = Some(reason);
                break;
            }
            written += 1;
        }

        self.pending.drain(..written);

        if let Some(reason) = failure {
            self.metrics
                .record_flush(written, self.pending.len(), started.elapsed().as_secs_f64());
            tracing::error!(
                written,
                pending = self.pending.len(),
                error = %reason,
                "Flush aborted"
            );
            return Err(Error::Persist {
                reason,
                pending: self.pending.len(),
            });
        }

        self.metrics
            .record_flush(written, 0, started.elapsed().as_secs_f64());

        if self.sync_on_flush {
            self.log.sync().map_err(|e| {
                tracing::error!(written, error = %e, "Flush written but not synced");
                Error::Persist {
                    reason: format!("sync failed: {}", e),
                    pending: 0,
                }
            })?;
        }

        tracing::info!(written, "Transactions flushed");

        Ok(written)
    }

    /// Sync and release the log
    ///
    /// Buffered transactions are not flushed implicitly; they are dropped
    /// with the state.
    pub fn close(mut self) -> Result<()> {
        if !self.pending.is_empty() {
            tracing::warn!(
                pending = self.pending.len(),
                "Closing ledger with unflushed transactions"
            );
        }

        self.log.sync()?;
        drop(self);

        tracing::info!("Transaction log closed");
        Ok(())
    }

    /// Full balance table, ordered by account
    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    /// Balance of one account; unknown accounts hold 0
    pub fn balance(&self, account: &Account) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|&b| u128::from(b)).sum()
    }

    /// Buffered transactions, oldest first
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Records replayed at startup
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    /// Metrics for this state
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Underlying log medium
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Underlying log medium, for maintenance such as failure injection
    pub fn log_mut(&mut self) -> &mut L {
        &mut self.log
    }
}
