//! Cross-rate resolver - derives asset/currency rates from USD series
//!
//! Every stored series is quoted in USD, so an arbitrary pair resolves to
//! either a passthrough, a reciprocal, or a merge-join of the two series
//! on exact timestamps. The result is a pull-based iterator; OHLC binning
//! composes on top without materializing anything.

use std::iter::Peekable;

use crate::store::TickSource;
use crate::types::Symbol;

type Ticks<'a> = Box<dyn Iterator<Item = (u64, f64)> + 'a>;

/// Resolve the `asset/currency` rate series over `[from, to]`.
///
/// A `to` of 0 means unbounded. Output timestamps are multiplied by
/// `time_mult` to convert the source's unit back to seconds (1 for raw
/// ticks, 86400 for the daily tier). Both series are assumed to share
/// the same time grid; a timestamp present in only one of them yields
/// no point.
pub fn resolve<'a, S: TickSource + ?Sized>(
    source: &'a S,
    asset: &Symbol,
    currency: &Symbol,
    from: u64,
    to: u64,
    time_mult: u64,
) -> RateIter<'a> {
    let to = if to == 0 { u64::MAX - 1 } else { to };
    let kind = if asset.is_usd() {
        Kind::Reciprocal(source.ticks(currency, from, to))
    } else if currency.is_usd() {
        Kind::Direct(source.ticks(asset, from, to))
    } else {
        Kind::Cross {
            asset: source.ticks(asset, from, to).peekable(),
            currency: source.ticks(currency, from, to).peekable(),
        }
    };
    RateIter { kind, time_mult }
}

/// Lazy `(timestamp, rate)` sequence; dropping it early is free.
pub struct RateIter<'a> {
    kind: Kind<'a>,
    time_mult: u64,
}

enum Kind<'a> {
    /// `currency == "usd"`: the asset's series unchanged.
    Direct(Ticks<'a>),
    /// `asset == "usd"`: 1 / currency price; zero prices are skipped.
    Reciprocal(Ticks<'a>),
    /// General pair: merge-join on exact timestamp equality.
    Cross {
        asset: Peekable<Ticks<'a>>,
        currency: Peekable<Ticks<'a>>,
    },
}

impl Iterator for RateIter<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<(u64, f64)> {
        let mult = self.time_mult;
        match &mut self.kind {
            Kind::Direct(ticks) => ticks.next().map(|(ts, price)| (ts * mult, price)),
            Kind::Reciprocal(ticks) => {
                for (ts, price) in ticks.by_ref() {
                    if price != 0.0 {
                        return Some((ts * mult, 1.0 / price));
                    }
                }
                None
            }
            Kind::Cross { asset, currency } => loop {
                let (&(ts_a, price_a), &(ts_c, price_c)) = match (asset.peek(), currency.peek()) {
                    (Some(a), Some(c)) => (a, c),
                    _ => return None,
                };
                if ts_a < ts_c {
                    asset.next();
                } else if ts_a > ts_c {
                    currency.next();
                } else {
                    asset.next();
                    currency.next();
                    if price_c != 0.0 {
                        return Some((ts_a * mult, price_a / price_c));
                    }
                }
            },
        }
    }
}
