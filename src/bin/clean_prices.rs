//! Price series cleanup tool.
//!
//! Usage: cargo run --bin clean_prices [-- --store]
//!
//! Loads the configured CSV snapshot, runs the outlier scan, and prints
//! the report stream. Dry-run by default; `--store` (or the
//! `clean.store_corrections` setting) persists corrections back into the
//! snapshot.

use pricefeed::clean::{clean_pass, CleanMode};
use pricefeed::config::AppConfig;
use pricefeed::store::MemoryStore;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;
    info!("config: {}", config.digest());

    let store_corrections =
        config.clean.store_corrections || std::env::args().any(|arg| arg == "--store");
    let mode = if store_corrections {
        CleanMode::Store
    } else {
        CleanMode::DryRun
    };

    let snapshot = config.store.snapshot_path();
    let store = MemoryStore::load_csv(&snapshot)?;

    let report = clean_pass(&store, mode, |event| {
        println!("{}", pricefeed::clean::render_event(event));
    })?;

    info!(
        symbols = report.symbols,
        flagged = report.flagged,
        corrected = report.corrected,
        "clean pass done"
    );

    if report.corrected > 0 {
        let rows = store.export_csv(&snapshot)?;
        info!(rows, path = %snapshot.display(), "corrected snapshot written");
    }

    Ok(())
}
