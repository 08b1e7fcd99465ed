//! Outlier cleaner - full-store anomaly scan with optional correction
//!
//! One ordered pass over the whole store with a 3-slot sliding window per
//! symbol (two-back, one-back, current). A point that deviates from the
//! geometric mean of its neighbours while the neighbours agree with each
//! other is flagged and, in store mode, rewritten to that mean. The window
//! always consumes the originally scanned values - corrections are
//! write-only side effects of the pass, they never feed later comparisons.

use tracing::info;

use crate::store::{PriceStore, StoreError, WriteBatch};
use crate::types::Symbol;

/// Minimum relative deviation of the middle point before it counts as an
/// anomaly.
pub const MIN_DEVIATION: f64 = 0.005;

/// How far the outer points may disagree, relative to the middle
/// deviation, for the middle to still be blamed.
pub const NEIGHBOUR_AGREEMENT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    /// Report anomalies, write nothing.
    DryRun,
    /// Report anomalies and persist corrections, flushed per symbol.
    Store,
}

/// Progress events emitted by a clean pass; both modes emit the same
/// stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanEvent {
    SymbolStart {
        symbol: Symbol,
    },
    Anomaly {
        symbol: Symbol,
        /// Timestamp of the flagged middle record.
        ts: u64,
        /// Window contents: two-back, flagged middle, current.
        before: f64,
        value: f64,
        after: f64,
        /// Geometric mean the record is corrected to.
        corrected: f64,
    },
}

/// Human-readable line for one event, matching the report stream format.
pub fn render_event(event: &CleanEvent) -> String {
    match event {
        CleanEvent::SymbolStart { symbol } => format!("# Checking symbol: {symbol}"),
        CleanEvent::Anomaly {
            symbol,
            ts,
            before,
            value,
            after,
            ..
        } => format!("{symbol} {ts} {before} {value} {after}"),
    }
}

/// Totals from one clean pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanReport {
    pub symbols: usize,
    pub flagged: usize,
    pub corrected: usize,
}

/// Run one clean pass over the whole store.
///
/// Holds no global lock; ingestion may interleave. The scan observes
/// chunked snapshots and corrections are idempotent overwrites, so a
/// concurrent commit at worst re-flags the same point next pass.
pub fn clean_pass<S, F>(store: &S, mode: CleanMode, mut sink: F) -> Result<CleanReport, StoreError>
where
    S: PriceStore + ?Sized,
    F: FnMut(&CleanEvent),
{
    let mut report = CleanReport::default();
    let mut batch = WriteBatch::new();
    let mut current: Option<Symbol> = None;
    let (mut a, mut b, mut c) = (0.0f64, 0.0f64, 0.0f64);
    let mut prev_ts = 0u64;

    for ((symbol, ts), price) in store.scan() {
        if current.as_ref() != Some(&symbol) {
            if mode == CleanMode::Store && !batch.is_empty() {
                store.commit(std::mem::take(&mut batch))?;
            }
            current = Some(symbol.clone());
            (a, b, c) = (0.0, 0.0, 0.0);
            report.symbols += 1;
            sink(&CleanEvent::SymbolStart {
                symbol: symbol.clone(),
            });
        }

        (a, b) = (b, c);
        c = price;

        // Window is full once the two-back slot holds a real price.
        if a != 0.0 {
            let mid = (a * c).sqrt();
            let dev_mid = (mid - b).abs() / b;
            let dev_outer = (a - c).abs() / b;
            if dev_outer * NEIGHBOUR_AGREEMENT < dev_mid && dev_mid > MIN_DEVIATION {
                report.flagged += 1;
                sink(&CleanEvent::Anomaly {
                    symbol: symbol.clone(),
                    ts: prev_ts,
                    before: a,
                    value: b,
                    after: c,
                    corrected: mid,
                });
                if mode == CleanMode::Store {
                    batch.set(symbol.clone(), prev_ts, mid);
                    report.corrected += 1;
                }
            }
        }
        prev_ts = ts;
    }

    if mode == CleanMode::Store && !batch.is_empty() {
        store.commit(batch)?;
    }

    let dry_run = mode == CleanMode::DryRun;
    info!(
        symbols = report.symbols,
        flagged = report.flagged,
        corrected = report.corrected,
        dry_run,
        "clean pass finished"
    );
    Ok(report)
}
