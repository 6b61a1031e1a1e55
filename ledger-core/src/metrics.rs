//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_transactions_applied_total` - Transactions accepted into the buffer
//! - `ledger_transactions_rejected_total` - Transactions failing validation
//! - `ledger_value_minted_total` - Value created by reward transactions
//! - `ledger_records_replayed_total` - Log records replayed at startup
//! - `ledger_records_flushed_total` - Records appended to the log
//! - `ledger_pending_transactions` - Current buffer length
//! - `ledger_flush_duration_seconds` - Histogram of flush latencies
//!
//! Every [`Metrics`] owns its registry, so several ledgers can live in one
//! process.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions applied
    pub transactions_applied: IntCounter,

    /// Transactions rejected by validation
    pub transactions_rejected: IntCounter,

    /// Value minted by rewards
    pub value_minted: IntCounter,

    /// Records replayed from the log
    pub records_replayed: IntCounter,

    /// Records flushed to the log
    pub records_flushed: IntCounter,

    /// Buffered transactions awaiting flush
    pub pending: IntGauge,

    /// Flush duration histogram
    pub flush_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_applied = IntCounter::new(
            "ledger_transactions_applied_total",
            "Transactions accepted into the buffer",
        )?;
        registry.register(Box::new(transactions_applied.clone()))?;

        let transactions_rejected = IntCounter::new(
            "ledger_transactions_rejected_total",
            "Transactions failing validation",
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let value_minted = IntCounter::new(
            "ledger_value_minted_total",
            "Value created by reward transactions",
        )?;
        registry.register(Box::new(value_minted.clone()))?;

        let records_replayed = IntCounter::new(
            "ledger_records_replayed_total",
            "Log records replayed at startup",
        )?;
        registry.register(Box::new(records_replayed.clone()))?;

        let records_flushed = IntCounter::new(
            "ledger_records_flushed_total",
            "Records appended to the transaction log",
        )?;
        registry.register(Box::new(records_flushed.clone()))?;

        let pending = IntGauge::new(
            "ledger_pending_transactions",
            "Buffered transactions awaiting flush",
        )?;
        registry.register(Box::new(pending.clone()))?;

        let flush_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_flush_duration_seconds",
                "Histogram of flush latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0]),
        )?;
        registry.register(Box::new(flush_duration.clone()))?;

        Ok(Self {
            transactions_applied,
            transactions_rejected,
            value_minted,
            records_replayed,
            records_flushed,
            pending,
            flush_duration,
            registry,
        })
    }

    /// Record an applied transaction; `minted` is nonzero for rewards
    pub fn record_applied(&self, minted: u64, pending: usize) {
        self.transactions_applied.inc();
        self.value_minted.inc_by(minted);
        self.pending.set(pending as i64);
    }

    /// Record a rejected transaction
    pub fn record_rejected(&self) {
        self.transactions_rejected.inc();
    }

    /// Record records replayed at startup
    pub fn record_replayed(&self, count: usize) {
        self.records_replayed.inc_by(count as u64);
    }

    /// Record a (possibly partial) flush
    pub fn record_flush(&self, written: usize, pending: usize, duration_seconds: f64) {
        self.records_flushed.inc_by(written as u64);
        self.pending.set(pending as i64);
        self.flush_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text format
    pub fn gather_text(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::Metrics(e.to_string()))
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transactions_applied", &self.transactions_applied.get())
            .field("transactions_rejected", &self.transactions_rejected.get())
            .field("records_flushed", &self.records_flushed.get())
            .field("pending", &self.pending.get())
            .finish_non_exhaustive()
    }
}
