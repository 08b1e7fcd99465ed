//! Bulk import of historical price snapshots.
//!
//! Consumes a CouchDB-style export: `rows[*].id` holds `timestamp / 10`
//! and `rows[*].doc.prices` maps symbol -> price. Each row commits as its
//! own batch, so a failed commit leaves earlier rows imported.

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::ingest::feeds::{number_field, valid_price};
use crate::store::{PriceStore, StoreError, WriteBatch};
use crate::types::Symbol;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed import payload: {0}")]
    Malformed(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one bulk import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportReport {
    pub rows: usize,
    pub records: usize,
}

/// Import every row of the export into the store.
pub fn import_rows<S: PriceStore + ?Sized>(
    store: &S,
    payload: &Value,
) -> Result<ImportReport, ImportError> {
    let rows = payload["rows"]
        .as_array()
        .ok_or(ImportError::Malformed("missing rows array"))?;

    let mut report = ImportReport::default();
    for row in rows {
        let timestamp = number_field(&row["id"]) as u64 * 10;
        let Some(prices) = row["doc"]["prices"].as_object() else {
            continue;
        };

        let mut batch = WriteBatch::new();
        for (symbol, value) in prices {
            let price = number_field(value);
            if !valid_price(price) {
                continue;
            }
            batch.set(Symbol::new(symbol), timestamp, price);
        }
        report.records += batch.len();
        store.commit(batch)?;
        report.rows += 1;
    }

    info!(rows = report.rows, records = report.records, "bulk import finished");
    Ok(report)
}
