//! Exchange feed adapters (Cryptowatch, FTX, Bitfinex, Binance)
//!
//! Each adapter normalizes one exchange's payload shape into lowercase
//! (symbol, price) quotes. Payloads arrive already parsed; transport and
//! polling live outside this crate.

mod binance;
mod bitfinex;
mod cryptowatch;
mod ftx;

pub use binance::BinanceFeed;
pub use bitfinex::BitfinexFeed;
pub use cryptowatch::CryptowatchFeed;
pub use ftx::FtxFeed;

use serde_json::Value;

use crate::config::CollectorConfig;
use crate::ingest::FeedAdapter;

/// Zero, negative, and non-finite prices are dropped everywhere.
pub(crate) fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Numeric field tolerant of exchanges that quote prices as strings.
pub(crate) fn number_field(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Adapters enabled by configuration, in a stable order.
pub fn enabled(config: &CollectorConfig) -> Vec<Box<dyn FeedAdapter>> {
    let mut adapters: Vec<Box<dyn FeedAdapter>> = Vec::new();
    if config.cryptowatch_enabled {
        adapters.push(Box::new(CryptowatchFeed));
    }
    if config.ftx_enabled {
        adapters.push(Box::new(FtxFeed));
    }
    if config.bitfinex_enabled {
        adapters.push(Box::new(BitfinexFeed));
    }
    if config.binance_enabled {
        adapters.push(Box::new(BinanceFeed));
    }
    adapters
}
