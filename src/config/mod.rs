//! Configuration management
//!
//! Loads defaults, then optional `config/default` / `config/local` files,
//! then `PRICEFEED_*` environment variables via `.env`.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub collector: CollectorConfig,
    pub clean: CleanConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Data directory holding the price snapshot.
    pub data_dir: String,
    /// Snapshot file name inside the data directory.
    pub snapshot_file: String,
}

impl StoreConfig {
    pub fn snapshot_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.snapshot_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Enable the Cryptowatch feed
    pub cryptowatch_enabled: bool,
    /// Enable the FTX feed
    pub ftx_enabled: bool,
    /// Enable the Bitfinex feed
    pub bitfinex_enabled: bool,
    /// Enable the Binance feed
    pub binance_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanConfig {
    /// Persist corrections instead of only reporting them.
    pub store_corrections: bool,
}

impl AppConfig {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("store.data_dir", "./data")?
            .set_default("store.snapshot_file", "prices.csv")?
            .set_default("collector.cryptowatch_enabled", true)?
            .set_default("collector.ftx_enabled", true)?
            .set_default("collector.bitfinex_enabled", true)?
            .set_default("collector.binance_enabled", true)?
            .set_default("clean.store_corrections", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PRICEFEED").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// One-line summary for startup logging.
    pub fn digest(&self) -> String {
        format!(
            "data_dir={} feeds=[cryptowatch:{} ftx:{} bitfinex:{} binance:{}] store_corrections={}",
            self.store.data_dir,
            self.collector.cryptowatch_enabled,
            self.collector.ftx_enabled,
            self.collector.bitfinex_enabled,
            self.collector.binance_enabled,
            self.clean.store_corrections,
        )
    }
}
