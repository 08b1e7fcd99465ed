//! Canonical price store - ordered (symbol, timestamp) -> price map
//!
//! The query and ingestion layers consume the store through the
//! [`PriceStore`] and [`TickSource`] traits; [`MemoryStore`] is the
//! ordered in-memory implementation backing the service. Scans hand out
//! bounded chunks copied under a read lock and reseek past the last key,
//! so a long-running pass never pins the lock and tolerates concurrent
//! commits (price writes are idempotent overwrites).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;
use tracing::info;

use crate::types::Symbol;

/// Entries copied per lock acquisition while scanning.
const SCAN_CHUNK: usize = 256;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Read access to an ordered tick sequence per symbol.
///
/// Implemented by the raw store and by derived views (the daily rollup),
/// so cross-rate resolution and binning run identically against either.
pub trait TickSource {
    /// Ordered, finite, restartable scan of `[from, to]` (inclusive bounds)
    /// for one symbol; timestamps strictly increasing.
    fn ticks(&self, symbol: &Symbol, from: u64, to: u64) -> Box<dyn Iterator<Item = (u64, f64)> + '_>;

    /// All symbols present, in ascending order.
    fn symbols(&self) -> Vec<Symbol>;

    /// Write generation for one symbol; moves whenever the symbol's range
    /// contents change. Cached aggregates revalidate against this.
    fn generation(&self, symbol: &Symbol) -> u64;
}

/// Full store contract consumed by ingestion, history, and cleaning.
pub trait PriceStore: TickSource {
    /// Point lookup.
    fn get(&self, symbol: &Symbol, ts: u64) -> Option<f64>;

    /// Atomic multi-put. Failure propagates to the caller; no retry here.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Whole-store scan, ordered by symbol then timestamp.
    fn scan(&self) -> Box<dyn Iterator<Item = ((Symbol, u64), f64)> + '_>;
}

/// Staged writes applied atomically by [`PriceStore::commit`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Vec<((Symbol, u64), f64)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one price; a later write to the same key wins at commit.
    pub fn set(&mut self, symbol: Symbol, ts: u64, price: f64) {
        self.entries.push(((symbol, ts), price));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
struct Inner {
    map: BTreeMap<(Symbol, u64), f64>,
    generations: HashMap<Symbol, u64>,
}

/// Ordered in-memory price store with optional CSV snapshots.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored price records.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a snapshot produced by [`MemoryStore::export_csv`].
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self::new();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;

        let mut batch = WriteBatch::new();
        for row in reader.deserialize() {
            let row: SnapshotRow = row?;
            batch.set(Symbol::new(&row.symbol), row.timestamp, row.price);
        }
        let records = batch.len();
        store.commit(batch)?;
        info!(
            path = %path.as_ref().display(),
            records,
            "price snapshot loaded"
        );
        Ok(store)
    }

    /// Write the whole store out as a CSV snapshot, returning the row count.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;

        let mut rows = 0usize;
        for ((symbol, ts), price) in self.scan() {
            writer.serialize(SnapshotRow {
                symbol: symbol.as_str().to_string(),
                timestamp: ts,
                price,
            })?;
            rows += 1;
        }
        writer.flush()?;
        Ok(rows)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    symbol: String,
    timestamp: u64,
    price: f64,
}

impl TickSource for MemoryStore {
    fn ticks(&self, symbol: &Symbol, from: u64, to: u64) -> Box<dyn Iterator<Item = (u64, f64)> + '_> {
        Box::new(RangeScan {
            store: self,
            symbol: symbol.clone(),
            next_ts: from,
            end_ts: to,
            buf: VecDeque::new(),
            done: from > to,
        })
    }

    fn symbols(&self) -> Vec<Symbol> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut last: Option<&Symbol> = None;
        for (symbol, _) in inner.map.keys() {
            if last != Some(symbol) {
                out.push(symbol.clone());
                last = Some(symbol);
            }
        }
        out
    }

    fn generation(&self, symbol: &Symbol) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.generations.get(symbol).copied())
            .unwrap_or(0)
    }
}

impl PriceStore for MemoryStore {
    fn get(&self, symbol: &Symbol, ts: u64) -> Option<f64> {
        let inner = self.inner.read().ok()?;
        inner.map.get(&(symbol.clone(), ts)).copied()
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut touched: HashSet<Symbol> = HashSet::new();
        for ((symbol, ts), price) in batch.entries {
            touched.insert(symbol.clone());
            inner.map.insert((symbol, ts), price);
        }
        for symbol in touched {
            *inner.generations.entry(symbol).or_insert(0) += 1;
        }
        Ok(())
    }

    fn scan(&self) -> Box<dyn Iterator<Item = ((Symbol, u64), f64)> + '_> {
        Box::new(FullScan {
            store: self,
            cursor: None,
            buf: VecDeque::new(),
            done: false,
        })
    }
}

/// Chunked per-symbol range scan over a [`MemoryStore`].
struct RangeScan<'a> {
    store: &'a MemoryStore,
    symbol: Symbol,
    /// Next timestamp to fetch (inclusive).
    next_ts: u64,
    end_ts: u64,
    buf: VecDeque<(u64, f64)>,
    done: bool,
}

impl RangeScan<'_> {
    fn refill(&mut self) {
        let Ok(inner) = self.store.inner.read() else {
            self.done = true;
            return;
        };
        let lower = (self.symbol.clone(), self.next_ts);
        let upper = (self.symbol.clone(), self.end_ts);
        for (&(_, ts), &price) in inner
            .map
            .range((Bound::Included(lower), Bound::Included(upper)))
            .take(SCAN_CHUNK)
        {
            self.buf.push_back((ts, price));
        }
        match self.buf.back() {
            Some(&(last, _)) if last < self.end_ts => self.next_ts = last + 1,
            _ => self.done = true,
        }
        if self.buf.len() < SCAN_CHUNK {
            self.done = true;
        }
    }
}

impl Iterator for RangeScan<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<(u64, f64)> {
        if self.buf.is_empty() && !self.done {
            self.refill();
        }
        self.buf.pop_front()
    }
}

/// Chunked whole-store scan, symbol then timestamp order.
struct FullScan<'a> {
    store: &'a MemoryStore,
    /// Last key handed out; the next chunk starts strictly after it.
    cursor: Option<(Symbol, u64)>,
    buf: VecDeque<((Symbol, u64), f64)>,
    done: bool,
}

impl FullScan<'_> {
    fn refill(&mut self) {
        let Ok(inner) = self.store.inner.read() else {
            self.done = true;
            return;
        };
        let lower = match self.cursor.take() {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        for (key, &price) in inner
            .map
            .range((lower, Bound::Unbounded))
            .take(SCAN_CHUNK)
        {
            self.buf.push_back((key.clone(), price));
        }
        match self.buf.back() {
            Some((key, _)) => self.cursor = Some(key.clone()),
            None => self.done = true,
        }
        if self.buf.len() < SCAN_CHUNK {
            self.done = true;
        }
    }
}

impl Iterator for FullScan<'_> {
    type Item = ((Symbol, u64), f64);

    fn next(&mut self) -> Option<((Symbol, u64), f64)> {
        if self.buf.is_empty() && !self.done {
            self.refill();
        }
        self.buf.pop_front()
    }
}
