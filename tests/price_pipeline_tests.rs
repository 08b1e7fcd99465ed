//! End-to-end tests for the collection -> store -> query pipeline.

#[cfg(test)]
mod tests {
    use pricefeed::clean::{clean_pass, CleanEvent, CleanMode};
    use pricefeed::history;
    use pricefeed::ingest::feeds::{BinanceFeed, BitfinexFeed, CryptowatchFeed, FtxFeed};
    use pricefeed::ingest::{import, Collector};
    use pricefeed::ohlc;
    use pricefeed::rates;
    use pricefeed::rollup::{DailyView, TotalView};
    use pricefeed::store::{MemoryStore, PriceStore, TickSource, WriteBatch};
    use pricefeed::types::{Symbol, DAY_SECS};
    use serde_json::json;

    fn store_with(rows: &[(&str, u64, f64)]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for &(symbol, ts, price) in rows {
            batch.set(Symbol::new(symbol), ts, price);
        }
        store.commit(batch).unwrap();
        store
    }

    // ========================================================================
    // Collection cycle
    // ========================================================================

    #[tokio::test]
    async fn full_cycle_averages_across_real_feed_payloads() {
        let store = MemoryStore::new();
        let collector = Collector::new();

        let cryptowatch = json!({
            "result": {"rows": [
                {"symbol": "BTC", "price": 27000.0},
                {"symbol": "ETH", "price": 1800.0},
            ]}
        });
        let ftx = json!({
            "result": [
                {"type": "spot", "baseCurrency": "BTC", "quoteCurrency": "USD", "price": 27100.0},
                {"type": "future", "name": "BTC-1231", "price": 27200.0},
            ]
        });
        let bitfinex = json!([
            ["tBTCUSD", 0, 0, 0, 0, 0, 0, 27200.0],
            ["tETHBTC", 0, 0, 0, 0, 0, 0, 0.066],
        ]);
        let binance = json!([
            {"symbol": "BTCUSDT", "price": "26900.0"},
            {"symbol": "BTCBUSD", "price": "27100.0"},
        ]);

        let mut session = collector.begin_cycle().await;
        session.ingest(&CryptowatchFeed, &cryptowatch).unwrap();
        session.ingest(&FtxFeed, &ftx).unwrap();
        session.ingest(&BitfinexFeed, &bitfinex).unwrap();
        session.ingest(&BinanceFeed, &binance).unwrap();
        let report = session.commit_at(&store, 600).unwrap();

        // btc, btc-fut, eth
        assert_eq!(report.entries, 3);
        // cryptowatch 27000 + ftx spot 27100 + bitfinex 27200 + binance
        // average (26900+27100)/2 = 27000, all weighted equally.
        assert_eq!(store.get(&Symbol::new("btc"), 600), Some(27075.0));
        assert_eq!(store.get(&Symbol::new("btc-fut"), 600), Some(27200.0));
        assert_eq!(store.get(&Symbol::new("eth"), 600), Some(1800.0));
    }

    #[tokio::test]
    async fn each_cycle_writes_one_minute_aligned_row_per_symbol() {
        let store = MemoryStore::new();
        let collector = Collector::new();

        for (ts, price) in [(600u64, "100.0"), (660, "110.0")] {
            let payload = json!([{"symbol": "BTCUSDT", "price": price}]);
            let mut session = collector.begin_cycle().await;
            session.ingest(&BinanceFeed, &payload).unwrap();
            session.commit_at(&store, ts).unwrap();
        }

        let ticks: Vec<_> = store.ticks(&Symbol::new("btc"), 0, 0).collect();
        assert!(ticks.is_empty());
        let ticks: Vec<_> = store.ticks(&Symbol::new("btc"), 0, u64::MAX - 1).collect();
        assert_eq!(ticks, vec![(600, 100.0), (660, 110.0)]);
    }

    // ========================================================================
    // Cross-rate and OHLC queries
    // ========================================================================

    #[test]
    fn usd_rate_equals_raw_series_and_reciprocal_mirrors() {
        let store = store_with(&[
            ("btc", 10, 100.0),
            ("btc", 20, 110.0),
            ("eth", 10, 4.0),
            ("eth", 20, 5.0),
        ]);
        let btc = Symbol::new("btc");
        let usd = Symbol::new("usd");

        let direct: Vec<_> = rates::resolve(&store, &btc, &usd, 10, 20, 1).collect();
        let raw: Vec<_> = store.ticks(&btc, 10, 20).collect();
        assert_eq!(direct, raw);

        let usd_btc: Vec<_> = rates::resolve(&store, &usd, &btc, 10, 20, 1).collect();
        for ((t1, r1), (t2, r2)) in usd_btc.iter().zip(direct.iter()) {
            assert_eq!(t1, t2);
            assert!((r1 * r2 - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn cross_rate_feeds_ohlc_binning_lazily() {
        let store = store_with(&[
            ("btc", 0, 100.0),
            ("btc", 30, 110.0),
            ("btc", 61, 90.0),
            ("usdless", 0, 1.0),
        ]);

        let rate_points = rates::resolve(
            &store,
            &Symbol::new("btc"),
            &Symbol::new("usd"),
            0,
            0,
            1,
        );
        let bars: Vec<_> = ohlc::bin(rate_points, 60).collect();

        assert_eq!(bars.len(), 2);
        assert_eq!(
            (bars[0].frame_start, bars[0].open, bars[0].high, bars[0].low, bars[0].close),
            (0, 100.0, 110.0, 100.0, 110.0)
        );
        assert_eq!(
            (bars[1].frame_start, bars[1].open, bars[1].high, bars[1].low, bars[1].close),
            (60, 90.0, 90.0, 90.0, 90.0)
        );
    }

    #[test]
    fn merge_join_skips_lonely_timestamps() {
        let store = store_with(&[
            ("aaa", 10, 2.0),
            ("aaa", 20, 4.0),
            ("aaa", 30, 6.0),
            ("bbb", 10, 1.0),
            ("bbb", 30, 2.0),
        ]);

        let points: Vec<_> =
            rates::resolve(&store, &Symbol::new("aaa"), &Symbol::new("bbb"), 0, 0, 1).collect();
        assert_eq!(points, vec![(10, 2.0), (30, 3.0)]);
    }

    // ========================================================================
    // Rollup tiers
    // ========================================================================

    #[test]
    fn daily_tier_serves_cross_rate_queries_in_seconds() {
        let store = store_with(&[
            ("btc", 600, 100.0),
            ("btc", 1200, 110.0),
            ("btc", DAY_SECS + 600, 200.0),
        ]);
        let daily = DailyView::new(&store);

        let points: Vec<_> = rates::resolve(
            &daily,
            &Symbol::new("btc"),
            &Symbol::new("usd"),
            0,
            0,
            DAY_SECS,
        )
        .collect();

        assert_eq!(points, vec![(0, 105.0), (DAY_SECS, 200.0)]);
    }

    #[test]
    fn directory_reflects_commits_as_they_land() {
        let store = store_with(&[("btc", 600, 100.0)]);
        let daily = DailyView::new(&store);
        let total = TotalView::new(&daily);

        let before = total.directory();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].1.day_count, 1);

        let mut batch = WriteBatch::new();
        batch.set(Symbol::new("btc"), 3 * DAY_SECS, 120.0);
        batch.set(Symbol::new("eth"), 600, 4.0);
        store.commit(batch).unwrap();

        let after = total.directory();
        assert_eq!(after.len(), 2);
        let btc = &after[0];
        assert_eq!(btc.1.first_day, 0);
        assert_eq!(btc.1.last_day, 3);
        assert_eq!(btc.1.day_count, 2);
    }

    // ========================================================================
    // Import and history
    // ========================================================================

    #[test]
    fn imported_history_answers_snapshot_queries() {
        let store = MemoryStore::new();
        let payload = json!({
            "rows": [
                {"id": 60, "doc": {"prices": {"btc": 29000.0, "eth": 725.0}}},
            ]
        });
        import::import_rows(&store, &payload).unwrap();

        let snap = history::snapshot(&store, 600, Some(&Symbol::new("eth"))).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0], (Symbol::new("btc"), 40.0));
        assert_eq!(snap[1], (Symbol::new("eth"), 1.0));

        let missing = history::snapshot(&store, 660, Some(&Symbol::new("eth")));
        assert!(missing.is_err());
    }

    // ========================================================================
    // Outlier cleaning
    // ========================================================================

    #[test]
    fn clean_pass_reports_and_corrects_across_symbols() {
        let store = store_with(&[
            ("btc", 60, 100.0),
            ("btc", 120, 150.0),
            ("btc", 180, 101.0),
            ("eth", 60, 4.0),
            ("eth", 120, 4.01),
            ("eth", 180, 4.02),
        ]);

        let mut dry_events = Vec::new();
        let dry = clean_pass(&store, CleanMode::DryRun, |e| dry_events.push(e.clone())).unwrap();
        assert_eq!(dry.symbols, 2);
        assert_eq!(dry.flagged, 1);
        assert_eq!(store.get(&Symbol::new("btc"), 120), Some(150.0));

        let mut store_events = Vec::new();
        let wet = clean_pass(&store, CleanMode::Store, |e| store_events.push(e.clone())).unwrap();
        assert_eq!(wet.flagged, 1);

        // Both modes emit the same stream.
        let anomalies = |events: &[CleanEvent]| -> Vec<CleanEvent> {
            events
                .iter()
                .filter(|e| matches!(e, CleanEvent::Anomaly { .. }))
                .cloned()
                .collect()
        };
        assert_eq!(anomalies(&dry_events), anomalies(&store_events));

        let fixed = store.get(&Symbol::new("btc"), 120).unwrap();
        assert!((fixed - (100.0f64 * 101.0).sqrt()).abs() < 1e-9);
        assert_eq!(store.get(&Symbol::new("eth"), 120), Some(4.01));
    }

    #[test]
    fn queries_see_corrected_values_after_store_clean() {
        let store = store_with(&[
            ("btc", 0, 100.0),
            ("btc", 60, 150.0),
            ("btc", 120, 101.0),
        ]);
        clean_pass(&store, CleanMode::Store, |_| {}).unwrap();

        let bars: Vec<_> = ohlc::bin(
            rates::resolve(&store, &Symbol::new("btc"), &Symbol::new("usd"), 0, 0, 1),
            60,
        )
        .collect();
        assert_eq!(bars.len(), 3);
        let corrected = (100.0f64 * 101.0).sqrt();
        assert!((bars[1].open - corrected).abs() < 1e-9);
    }
}
