//! Rollup tiers over the raw price series
//!
//! The aggregation framework contract: a tier supplies a PROBE (query key
//! to underlying scan range) and a REDUCE (scanned sequence to one value,
//! or absent when the range is empty); [`AggregatorView`] caches reduced
//! values per key and revalidates them against the underlying symbol's
//! write generation. The invalidation strategy is deliberately this thin -
//! anything smarter can replace it behind the same [`Tier`] contract.
//!
//! Two tiers ship here: the daily average ([`DailyTier`], exposed as a
//! [`TickSource`] keyed by day index so cross-rate and OHLC queries run on
//! it unchanged) and the total range summary ([`TotalTier`], built atop
//! the daily view).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use crate::store::TickSource;
use crate::types::{Symbol, SymbolRange, DAY_SECS};

/// Underlying scan range one tier probe resolves to.
pub struct ScanRange {
    pub symbol: Symbol,
    /// Inclusive bounds in the underlying source's time unit.
    pub from: u64,
    pub to: u64,
}

/// One rollup tier: probe a key into a scan range, reduce the scan.
pub trait Tier {
    type Key: Eq + Hash + Clone;
    type Value: Clone;

    fn probe(&self, key: &Self::Key) -> ScanRange;

    /// Reduce the scanned sequence; `None` when the range is empty.
    fn reduce(&self, scanned: &mut dyn Iterator<Item = (u64, f64)>) -> Option<Self::Value>;
}

/// Caching consumer of the [`Tier`] contract.
///
/// Each cached value is stamped with the probed symbol's write generation
/// at compute time; a moved generation forces a recompute. Absent results
/// are cached too.
pub struct AggregatorView<'a, S: TickSource + ?Sized, T: Tier> {
    source: &'a S,
    tier: T,
    cache: RwLock<HashMap<T::Key, (u64, Option<T::Value>)>>,
}

impl<'a, S: TickSource + ?Sized, T: Tier> AggregatorView<'a, S, T> {
    pub fn new(source: &'a S, tier: T) -> Self {
        Self {
            source,
            tier,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn query(&self, key: &T::Key) -> Option<T::Value> {
        let range = self.tier.probe(key);
        let generation = self.source.generation(&range.symbol);

        if let Ok(cache) = self.cache.read() {
            if let Some((stamp, value)) = cache.get(key) {
                if *stamp == generation {
                    return value.clone();
                }
            }
        }

        let mut scanned = self.source.ticks(&range.symbol, range.from, range.to);
        let value = self.tier.reduce(&mut scanned);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.clone(), (generation, value.clone()));
        }
        value
    }
}

/// Daily tier: mean price of a symbol's ticks within one UTC day.
pub struct DailyTier;

impl Tier for DailyTier {
    type Key = (Symbol, u64);
    type Value = f64;

    fn probe(&self, (symbol, day): &Self::Key) -> ScanRange {
        ScanRange {
            symbol: symbol.clone(),
            from: day.saturating_mul(DAY_SECS),
            to: day
                .saturating_add(1)
                .saturating_mul(DAY_SECS)
                .saturating_sub(1),
        }
    }

    fn reduce(&self, scanned: &mut dyn Iterator<Item = (u64, f64)>) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0u64;
        for (_, price) in scanned {
            sum += price;
            count += 1;
        }
        (count > 0).then(|| sum / count as f64)
    }
}

/// Daily averages of the raw store, addressable by day index.
///
/// Point queries go through the cached tier; range scans stream straight
/// off the raw series, bucketing by day on the fly, so an unbounded day
/// range costs one pass over the symbol's data.
pub struct DailyView<'a, S: TickSource + ?Sized> {
    inner: AggregatorView<'a, S, DailyTier>,
}

impl<'a, S: TickSource + ?Sized> DailyView<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            inner: AggregatorView::new(source, DailyTier),
        }
    }

    /// Cached mean price for one (symbol, day).
    pub fn day_average(&self, symbol: &Symbol, day: u64) -> Option<f64> {
        self.inner.query(&(symbol.clone(), day))
    }
}

impl<S: TickSource + ?Sized> TickSource for DailyView<'_, S> {
    fn ticks(&self, symbol: &Symbol, from: u64, to: u64) -> Box<dyn Iterator<Item = (u64, f64)> + '_> {
        let from_ts = from.saturating_mul(DAY_SECS);
        let to_ts = to
            .saturating_add(1)
            .saturating_mul(DAY_SECS)
            .saturating_sub(1);
        Box::new(DayMeans {
            raw: self.inner.source.ticks(symbol, from_ts, to_ts),
            pending: None,
        })
    }

    fn symbols(&self) -> Vec<Symbol> {
        self.inner.source.symbols()
    }

    fn generation(&self, symbol: &Symbol) -> u64 {
        self.inner.source.generation(symbol)
    }
}

/// Streams (day, mean) from an ordered raw tick scan.
struct DayMeans<'a> {
    raw: Box<dyn Iterator<Item = (u64, f64)> + 'a>,
    /// Day under accumulation: (day, sum, count).
    pending: Option<(u64, f64, u64)>,
}

impl Iterator for DayMeans<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<(u64, f64)> {
        loop {
            let Some((ts, price)) = self.raw.next() else {
                return self
                    .pending
                    .take()
                    .map(|(day, sum, count)| (day, sum / count as f64));
            };
            let day = ts / DAY_SECS;
            match &mut self.pending {
                Some((open_day, sum, count)) if *open_day == day => {
                    *sum += price;
                    *count += 1;
                }
                Some(_) => {
                    let done = self.pending.replace((day, price, 1));
                    return done.map(|(day, sum, count)| (day, sum / count as f64));
                }
                None => self.pending = Some((day, price, 1)),
            }
        }
    }
}

/// Total tier: which days a symbol's history covers, built atop the
/// daily view.
pub struct TotalTier;

impl Tier for TotalTier {
    type Key = Symbol;
    type Value = SymbolRange;

    fn probe(&self, symbol: &Symbol) -> ScanRange {
        ScanRange {
            symbol: symbol.clone(),
            from: 0,
            to: u64::MAX - 1,
        }
    }

    fn reduce(&self, scanned: &mut dyn Iterator<Item = (u64, f64)>) -> Option<SymbolRange> {
        let (first_day, _) = scanned.next()?;
        let mut last_day = first_day;
        let mut day_count = 1u64;
        for (day, _) in scanned {
            last_day = day;
            day_count += 1;
        }
        Some(SymbolRange {
            first_day,
            last_day,
            day_count,
        })
    }
}

/// The symbol directory: per-symbol day ranges over the daily view.
pub struct TotalView<'a, S: TickSource + ?Sized> {
    inner: AggregatorView<'a, DailyView<'a, S>, TotalTier>,
}

impl<'a, S: TickSource + ?Sized> TotalView<'a, S> {
    pub fn new(daily: &'a DailyView<'a, S>) -> Self {
        Self {
            inner: AggregatorView::new(daily, TotalTier),
        }
    }

    /// Day range covered by one symbol, if it has any data.
    pub fn range(&self, symbol: &Symbol) -> Option<SymbolRange> {
        self.inner.query(symbol)
    }

    /// Every symbol with data, in order, with its day range.
    pub fn directory(&self) -> Vec<(Symbol, SymbolRange)> {
        self.inner
            .source
            .symbols()
            .into_iter()
            .filter_map(|symbol| {
                let range = self.inner.query(&symbol)?;
                Some((symbol, range))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PriceStore, WriteBatch};

    fn store_with(rows: &[(&str, u64, f64)]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for &(symbol, ts, price) in rows {
            batch.set(Symbol::new(symbol), ts, price);
        }
        store.commit(batch).unwrap();
        store
    }

    #[test]
    fn daily_average_is_the_mean_of_the_day() {
        let store = store_with(&[
            ("btc", 60, 100.0),
            ("btc", 120, 110.0),
            ("btc", DAY_SECS + 60, 200.0),
        ]);
        let daily = DailyView::new(&store);

        assert_eq!(daily.day_average(&Symbol::new("btc"), 0), Some(105.0));
        assert_eq!(daily.day_average(&Symbol::new("btc"), 1), Some(200.0));
        assert_eq!(daily.day_average(&Symbol::new("btc"), 2), None);
    }

    #[test]
    fn cached_value_invalidates_when_the_day_changes() {
        let store = store_with(&[("btc", 60, 100.0)]);
        let daily = DailyView::new(&store);
        let btc = Symbol::new("btc");

        assert_eq!(daily.day_average(&btc, 0), Some(100.0));

        let mut batch = WriteBatch::new();
        batch.set(btc.clone(), 120, 200.0);
        store.commit(batch).unwrap();

        assert_eq!(daily.day_average(&btc, 0), Some(150.0));
    }

    #[test]
    fn daily_view_streams_day_means_in_order() {
        let store = store_with(&[
            ("btc", 60, 100.0),
            ("btc", 120, 110.0),
            ("btc", 2 * DAY_SECS, 90.0),
        ]);
        let daily = DailyView::new(&store);

        let means: Vec<_> = daily.ticks(&Symbol::new("btc"), 0, u64::MAX - 1).collect();
        assert_eq!(means, vec![(0, 105.0), (2, 90.0)]);
    }

    #[test]
    fn daily_view_range_respects_day_bounds() {
        let store = store_with(&[
            ("btc", 60, 100.0),
            ("btc", DAY_SECS, 200.0),
            ("btc", 2 * DAY_SECS, 300.0),
        ]);
        let daily = DailyView::new(&store);

        let means: Vec<_> = daily.ticks(&Symbol::new("btc"), 1, 1).collect();
        assert_eq!(means, vec![(1, 200.0)]);
    }

    #[test]
    fn total_range_counts_days_with_data() {
        let store = store_with(&[
            ("btc", 60, 100.0),
            ("btc", DAY_SECS, 200.0),
            ("btc", 5 * DAY_SECS, 300.0),
        ]);
        let daily = DailyView::new(&store);
        let total = TotalView::new(&daily);

        assert_eq!(
            total.range(&Symbol::new("btc")),
            Some(SymbolRange {
                first_day: 0,
                last_day: 5,
                day_count: 3,
            })
        );
        assert_eq!(total.range(&Symbol::new("eth")), None);
    }

    #[test]
    fn directory_lists_every_symbol_with_data() {
        let store = store_with(&[("eth", DAY_SECS, 4.0), ("btc", 60, 100.0)]);
        let daily = DailyView::new(&store);
        let total = TotalView::new(&daily);

        let directory = total.directory();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory[0].0, Symbol::new("btc"));
        assert_eq!(directory[0].1.first_day, 0);
        assert_eq!(directory[1].0, Symbol::new("eth"));
        assert_eq!(directory[1].1.first_day, 1);
    }
}
