//! Point-in-time history snapshots.
//!
//! Answers "what did every symbol cost at instant T", optionally rebased
//! against another currency's price at the same instant.

use thiserror::Error;

use crate::store::PriceStore;
use crate::types::Symbol;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// The rebasing divisor is mandatory; without a currency price at the
    /// requested instant the whole snapshot fails.
    #[error("no price for {currency} at {ts}")]
    DivisorNotFound { currency: Symbol, ts: u64 },
}

/// Prices of every symbol holding a record at exactly `ts`, in symbol
/// order. Symbols without a record at that instant are omitted. With a
/// `currency`, every price is divided by that currency's price at `ts`.
pub fn snapshot<S: PriceStore + ?Sized>(
    store: &S,
    ts: u64,
    currency: Option<&Symbol>,
) -> Result<Vec<(Symbol, f64)>, HistoryError> {
    let divisor = match currency {
        Some(currency) => {
            store
                .get(currency, ts)
                .ok_or_else(|| HistoryError::DivisorNotFound {
                    currency: currency.clone(),
                    ts,
                })?
        }
        None => 1.0,
    };

    let mut out = Vec::new();
    for symbol in store.symbols() {
        if let Some(price) = store.get(&symbol, ts) {
            out.push((symbol, price / divisor));
        }
    }
    Ok(out)
}
