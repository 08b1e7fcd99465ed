//! Bitfinex tickers adapter.
//!
//! Payload shape: a bare array of ticker rows, each an array whose first
//! element is the pair (`"tBTCUSD"` or `"tBTC:USD"`) and whose eighth
//! element is the last price. Pairs without a colon carry a 3-character
//! base. Only USD-quoted pairs contribute.

use serde_json::Value;

use crate::ingest::feeds::{number_field, valid_price};
use crate::ingest::{FeedAdapter, FeedError};
use crate::types::Symbol;

/// Index of the last-price field in a ticker row.
const PRICE_FIELD: usize = 7;

pub struct BitfinexFeed;

impl BitfinexFeed {
    fn split_pair(pair: &str) -> Option<(&str, &str)> {
        let rest = pair.strip_prefix('t')?;
        match rest.split_once(':') {
            Some((base, quote)) => Some((base, quote)),
            None if rest.len() > 3 => Some(rest.split_at(3)),
            None => None,
        }
    }
}

impl FeedAdapter for BitfinexFeed {
    fn name(&self) -> &'static str {
        "bitfinex"
    }

    fn parse(&self, payload: &Value) -> Result<Vec<(Symbol, f64)>, FeedError> {
        let rows = payload
            .as_array()
            .ok_or_else(|| FeedError::malformed(self.name(), "expected ticker array"))?;

        let mut quotes = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(pair) = row[0].as_str() else {
                continue;
            };
            let Some((base, quote)) = Self::split_pair(pair) else {
                continue;
            };
            if quote != "USD" {
                continue;
            }
            let price = number_field(&row[PRICE_FIELD]);
            if !valid_price(price) {
                continue;
            }
            quotes.push((Symbol::new(base), price));
        }
        Ok(quotes)
    }
}
