//! Ingestion normalizer - multi-exchange quote collection
//!
//! Each exchange feed is an adapter that turns an already-parsed payload
//! into normalized (symbol, price) quotes; the [`Collector`] averages
//! repeated quotes per symbol across feeds and commits one batched write
//! per collection cycle at a minute-aligned timestamp.

pub mod feeds;
pub mod import;

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{PriceStore, StoreError, WriteBatch};
use crate::types::Symbol;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{feed}: malformed payload: {reason}")]
    Malformed { feed: &'static str, reason: String },
}

impl FeedError {
    pub(crate) fn malformed(feed: &'static str, reason: impl Into<String>) -> Self {
        FeedError::Malformed {
            feed,
            reason: reason.into(),
        }
    }
}

/// One exchange feed, normalized.
///
/// `parse` applies the exchange-specific extraction rules and returns the
/// quotes worth accumulating; invalid prices are dropped inside, never
/// reported. Adding an exchange means adding an implementation here -
/// the averaging and commit logic below never changes.
pub trait FeedAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extract (symbol, price) quotes from one feed payload.
    fn parse(&self, payload: &Value) -> Result<Vec<(Symbol, f64)>, FeedError>;
}

/// Transient per-cycle quote averages: symbol -> (price sum, quote count).
#[derive(Debug, Default)]
pub struct QuoteAccumulator {
    quotes: HashMap<Symbol, (f64, u32)>,
}

impl QuoteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one quote in; repeated quotes for a symbol average out at
    /// commit time, they never overwrite each other.
    pub fn add(&mut self, symbol: Symbol, price: f64) {
        let entry = self.quotes.entry(symbol).or_insert((0.0, 0));
        entry.0 += price;
        entry.1 += 1;
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
    }

    /// Arithmetic mean per symbol.
    fn averaged(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.quotes
            .iter()
            .map(|(symbol, &(sum, count))| (symbol, sum / f64::from(count.max(1))))
    }

    /// Consume into averaged quotes; used by feeds that pre-average
    /// duplicates before contributing to the cycle accumulator.
    pub(crate) fn into_averaged(self) -> impl Iterator<Item = (Symbol, f64)> {
        self.quotes
            .into_iter()
            .map(|(symbol, (sum, count))| (symbol, sum / f64::from(count.max(1))))
    }
}

/// Outcome of one committed collection cycle.
#[derive(Debug, Clone, Copy)]
pub struct CommitReport {
    /// Minute-aligned timestamp every symbol was written at.
    pub timestamp: u64,
    /// Number of symbols committed.
    pub entries: usize,
}

/// Current time rounded to the nearest minute boundary; every quote of a
/// cycle lands on this one timestamp.
pub fn collection_timestamp() -> u64 {
    let now = Utc::now().timestamp().max(0) as u64;
    ((now + 30) / 60) * 60
}

/// Shared quote collector for one deployment.
///
/// Feed polls are scheduled independently and may fail independently, so
/// adapters contribute through an exclusive [`CycleSession`] that spans
/// the whole accumulate -> commit window of one cycle.
#[derive(Debug, Default)]
pub struct Collector {
    accumulator: tokio::sync::Mutex<QuoteAccumulator>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the exclusive session for one collection cycle.
    ///
    /// Caller responsibility: the accumulator must be empty when a cycle
    /// begins. Accumulating onto leftovers of an already-committed cycle
    /// is not idempotent - commit clears it, so this only happens when a
    /// previous session was dropped without committing.
    pub async fn begin_cycle(&self) -> CycleSession<'_> {
        let accumulator = self.accumulator.lock().await;
        if !accumulator.is_empty() {
            warn!(
                pending = accumulator.len(),
                "collection cycle starting on a non-empty accumulator"
            );
        }
        CycleSession { accumulator }
    }

    /// Combined one-shot cycle: accumulate every contribution, then commit
    /// atomically. A malformed payload drops only that feed's contribution.
    pub async fn collect_and_commit<S: PriceStore + ?Sized>(
        &self,
        store: &S,
        contributions: &[(&dyn FeedAdapter, &Value)],
    ) -> Result<CommitReport, StoreError> {
        let mut session = self.begin_cycle().await;
        session.accumulator.clear();
        for &(adapter, payload) in contributions {
            if let Err(err) = session.ingest(adapter, payload) {
                warn!(feed = adapter.name(), error = %err, "feed contribution dropped");
            }
        }
        session.commit(store)
    }
}

/// Exclusive handle on the accumulator for the span of one cycle.
pub struct CycleSession<'a> {
    accumulator: tokio::sync::MutexGuard<'a, QuoteAccumulator>,
}

impl CycleSession<'_> {
    /// Accumulate one feed's contribution without committing.
    pub fn ingest(&mut self, adapter: &dyn FeedAdapter, payload: &Value) -> Result<usize, FeedError> {
        let quotes = adapter.parse(payload)?;
        let count = quotes.len();
        for (symbol, price) in quotes {
            self.accumulator.add(symbol, price);
        }
        debug!(feed = adapter.name(), quotes = count, "feed contribution accumulated");
        Ok(count)
    }

    /// Symbols currently accumulated.
    pub fn pending(&self) -> usize {
        self.accumulator.len()
    }

    /// Flush the accumulator as one batched write at the current
    /// collection timestamp, then clear it.
    pub fn commit<S: PriceStore + ?Sized>(self, store: &S) -> Result<CommitReport, StoreError> {
        self.commit_at(store, collection_timestamp())
    }

    /// Commit at an explicit timestamp.
    pub fn commit_at<S: PriceStore + ?Sized>(
        mut self,
        store: &S,
        timestamp: u64,
    ) -> Result<CommitReport, StoreError> {
        let mut batch = WriteBatch::new();
        for (symbol, price) in self.accumulator.averaged() {
            batch.set(symbol.clone(), timestamp, price);
        }
        let entries = batch.len();
        store.commit(batch)?;
        self.accumulator.clear();
        info!(entries, timestamp, "collection cycle committed");
        Ok(CommitReport { timestamp, entries })
    }
}
