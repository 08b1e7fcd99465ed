//! Pricefeed Library
//!
//! Multi-exchange crypto price collection with time-ordered storage and
//! cross-rate, OHLC, rollup, and anomaly-cleaning queries.

pub mod clean;
pub mod config;
pub mod history;
pub mod ingest;
pub mod ohlc;
pub mod rates;
pub mod rollup;
pub mod store;
pub mod types;
