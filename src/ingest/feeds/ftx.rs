//! FTX markets adapter.
//!
//! Payload shape: `{"result": [{"type": "future"|"spot", "name": ...,
//! "baseCurrency": ..., "quoteCurrency": ..., "price": ...}]}`.
//!
//! Futures keep their listing name minus the expiry digits; a dated
//! contract like `BTC-1231` becomes `btc-fut` so every expiry of a series
//! accumulates under one symbol. Spot instruments contribute their base
//! currency and only when quoted in USD.

use serde_json::Value;

use crate::ingest::feeds::{number_field, valid_price};
use crate::ingest::{FeedAdapter, FeedError};
use crate::types::Symbol;

pub struct FtxFeed;

impl FtxFeed {
    fn future_symbol(name: &str) -> String {
        let stripped = name.trim_end_matches(|c: char| c.is_ascii_digit());
        if stripped.ends_with('-') {
            format!("{stripped}fut")
        } else {
            stripped.to_string()
        }
    }
}

impl FeedAdapter for FtxFeed {
    fn name(&self) -> &'static str {
        "ftx"
    }

    fn parse(&self, payload: &Value) -> Result<Vec<(Symbol, f64)>, FeedError> {
        let rows = payload["result"]
            .as_array()
            .ok_or_else(|| FeedError::malformed(self.name(), "missing result array"))?;

        let mut quotes = Vec::with_capacity(rows.len());
        for row in rows {
            let price = number_field(&row["price"]);
            if !valid_price(price) {
                continue;
            }

            let symbol = if row["type"].as_str() == Some("future") {
                Self::future_symbol(row["name"].as_str().unwrap_or(""))
            } else {
                if row["quoteCurrency"].as_str() != Some("USD") {
                    continue;
                }
                row["baseCurrency"].as_str().unwrap_or("").to_string()
            };
            if symbol.is_empty() {
                continue;
            }
            quotes.push((Symbol::new(&symbol), price));
        }
        Ok(quotes)
    }
}
