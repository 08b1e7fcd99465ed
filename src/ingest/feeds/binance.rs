//! Binance ticker adapter.
//!
//! Payload shape: a bare array of `{"symbol": "BTCUSDT", "price": "..."}`
//! rows; prices come back as strings. Only USDT/BUSD-quoted tickers
//! contribute, with the stablecoin suffix stripped. A symbol listed
//! against both stablecoins is averaged inside the feed first, so it
//! still counts as one quote toward the cycle average.

use serde_json::Value;

use crate::ingest::feeds::{number_field, valid_price};
use crate::ingest::{FeedAdapter, FeedError, QuoteAccumulator};
use crate::types::Symbol;

/// Recognized stablecoin quote suffixes.
const STABLE_SUFFIXES: [&str; 2] = ["USDT", "BUSD"];

pub struct BinanceFeed;

impl FeedAdapter for BinanceFeed {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn parse(&self, payload: &Value) -> Result<Vec<(Symbol, f64)>, FeedError> {
        let rows = payload
            .as_array()
            .ok_or_else(|| FeedError::malformed(self.name(), "expected ticker array"))?;

        let mut local = QuoteAccumulator::new();
        for row in rows {
            let Some(pair) = row["symbol"].as_str() else {
                continue;
            };
            let Some(base) = STABLE_SUFFIXES
                .iter()
                .find_map(|suffix| pair.strip_suffix(suffix))
            else {
                continue;
            };
            if base.is_empty() {
                continue;
            }
            let price = number_field(&row["price"]);
            if !valid_price(price) {
                continue;
            }
            local.add(Symbol::new(base), price);
        }
        Ok(local.into_averaged().collect())
    }
}
