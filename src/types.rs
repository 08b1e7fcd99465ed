//! Core types shared across the price store and query engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds in one UTC day; day indexes are `timestamp / DAY_SECS`.
pub const DAY_SECS: u64 = 24 * 60 * 60;

/// Canonical lowercase ticker for an asset or currency.
///
/// Every symbol entering the system is case-folded here, so store keys,
/// accumulator keys, and query arguments always compare consistently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Build a symbol, folding to lowercase.
    pub fn new(raw: &str) -> Self {
        Symbol(raw.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// USD is the quote leg every stored series is priced in.
    pub fn is_usd(&self) -> bool {
        self.0 == "usd"
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Symbol::new(raw)
    }
}

/// One OHLC bar over a fixed time frame. Query-time output, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    /// Start of the frame in output time units.
    pub frame_start: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Directory entry describing which UTC days hold data for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRange {
    /// First day index with at least one tick.
    pub first_day: u64,
    /// Last day index with at least one tick.
    pub last_day: u64,
    /// Number of days that actually hold data (gaps excluded).
    pub day_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_folds_case() {
        assert_eq!(Symbol::new("BTC").as_str(), "btc");
        assert_eq!(Symbol::new("Eth"), Symbol::new("eth"));
    }

    #[test]
    fn symbol_orders_lexicographically() {
        assert!(Symbol::new("btc") < Symbol::new("eth"));
        assert!(Symbol::new("btc-fut") > Symbol::new("btc"));
    }

    #[test]
    fn usd_detection() {
        assert!(Symbol::new("USD").is_usd());
        assert!(!Symbol::new("usdt").is_usd());
    }
}
