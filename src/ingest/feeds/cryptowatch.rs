//! Cryptowatch market summary adapter.
//!
//! Payload shape: `{"result": {"rows": [{"symbol": ..., "price": ...}]}}`.

use serde_json::Value;

use crate::ingest::feeds::{number_field, valid_price};
use crate::ingest::{FeedAdapter, FeedError};
use crate::types::Symbol;

pub struct CryptowatchFeed;

impl FeedAdapter for CryptowatchFeed {
    fn name(&self) -> &'static str {
        "cryptowatch"
    }

    fn parse(&self, payload: &Value) -> Result<Vec<(Symbol, f64)>, FeedError> {
        let rows = payload["result"]["rows"]
            .as_array()
            .ok_or_else(|| FeedError::malformed(self.name(), "missing result.rows"))?;

        let mut quotes = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(symbol) = row["symbol"].as_str() else {
                continue;
            };
            let price = number_field(&row["price"]);
            if !valid_price(price) {
                continue;
            }
            quotes.push((Symbol::new(symbol), price));
        }
        Ok(quotes)
    }
}
