//! Order-book fetcher: one depth snapshot per anchor timestamp.
//!
//! The depth endpoint only serves the current book, so each snapshot is
//! stamped with the anchor open time it aligns to. Snapshots are fetched
//! with a bounded fan-out (at most `concurrency` requests in flight) behind
//! a global throttle that enforces a minimum spacing between requests.

use crate::data::cache::SeriesCache;
use crate::data::provider::{DataError, DepthSnapshot, DepthSource};
use crate::domain::{Candle, DataKind, OrderBookRow};
use chrono::NaiveDateTime;
use rand::Rng;
use rayon::prelude::*;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEPTH_LIMIT: usize = 100;
const DEFAULT_CONCURRENCY: usize = 4;

/// Global pacing gate shared by the fan-out workers. Each caller claims the
/// next request slot, spaced `min_gap` (plus a small jitter) apart.
struct Throttle {
    min_gap: Duration,
    next_slot: Mutex<Instant>,
}

impl Throttle {
    fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    fn pace(&self) {
        if self.min_gap.is_zero() {
            return;
        }
        let wake = {
            let mut slot = self.next_slot.lock().unwrap();
            let wake = (*slot).max(Instant::now());
            let jitter_ms = self.min_gap.as_millis() as u64 / 4;
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
            *slot = wake + self.min_gap + jitter;
            wake
        };
        let now = Instant::now();
        if wake > now {
            std::thread::sleep(wake - now);
        }
    }
}

pub struct OrderBookFetcher<'a> {
    cache: &'a SeriesCache,
    source: &'a dyn DepthSource,
    concurrency: usize,
    request_spacing: Duration,
}

impl<'a> OrderBookFetcher<'a> {
    pub fn new(cache: &'a SeriesCache, source: &'a dyn DepthSource) -> Self {
        Self {
            cache,
            source,
            concurrency: DEFAULT_CONCURRENCY,
            request_spacing: Duration::from_millis(250),
        }
    }

    pub fn with_request_spacing(mut self, spacing: Duration) -> Self {
        self.request_spacing = spacing;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Return fresh cached rows, or snapshot the book once per anchor candle.
    pub fn fetch_and_store(&self, candles: &[Candle]) -> Result<Vec<OrderBookRow>, DataError> {
        let (fresh, cached) = self.cache.check::<OrderBookRow>(DataKind::OrderBook);
        if fresh {
            info!(records = cached.len(), "using local order book data");
            return Ok(cached);
        }

        if candles.is_empty() {
            warn!("no anchor candles provided for order book alignment");
            return Ok(Vec::new());
        }

        let symbol = self.cache.symbol();
        let throttle = Throttle::new(self.request_spacing);
        let mut rows = Vec::with_capacity(candles.len());

        for wave in candles.chunks(self.concurrency) {
            let wave_rows: Result<Vec<OrderBookRow>, DataError> = wave
                .par_iter()
                .map(|candle| {
                    throttle.pace();
                    let depth = self.source.fetch_depth(symbol, DEPTH_LIMIT)?;
                    Ok(snapshot_row(candle.open_time, &depth))
                })
                .collect();
            rows.extend(wave_rows?);
        }

        self.cache.save(DataKind::OrderBook, &rows)?;
        Ok(rows)
    }
}

/// Reduce a depth snapshot to top-of-book features.
fn snapshot_row(timestamp: NaiveDateTime, depth: &DepthSnapshot) -> OrderBookRow {
    let best_bid = depth.bids.first();
    let best_ask = depth.asks.first();
    OrderBookRow {
        timestamp,
        bid_price_top: best_bid.map(|l| l.price),
        bid_quantity_top: best_bid.map(|l| l.quantity),
        ask_price_top: best_ask.map(|l| l.price),
        ask_quantity_top: best_ask.map(|l| l.quantity),
        bid_ask_spread: match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        },
        total_bid_volume: depth.bids.iter().map(|l| l.quantity).sum(),
        total_ask_volume: depth.asks.iter().map(|l| l.quantity).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::BookLevel;
    use crate::domain::Interval;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDepth {
        snapshot: DepthSnapshot,
        calls: AtomicUsize,
    }

    impl FixedDepth {
        fn new(snapshot: DepthSnapshot) -> Self {
            Self {
                snapshot,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DepthSource for FixedDepth {
        fn fetch_depth(&self, _symbol: &str, _limit: usize) -> Result<DepthSnapshot, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshot.clone())
        }
    }

    struct FailingDepth;

    impl DepthSource for FailingDepth {
        fn fetch_depth(&self, _symbol: &str, _limit: usize) -> Result<DepthSnapshot, DataError> {
            Err(DataError::Network("connection refused".into()))
        }
    }

    fn sample_depth() -> DepthSnapshot {
        DepthSnapshot {
            bids: vec![
                BookLevel { price: 99.5, quantity: 2.0 },
                BookLevel { price: 99.0, quantity: 3.0 },
            ],
            asks: vec![
                BookLevel { price: 100.5, quantity: 1.5 },
                BookLevel { price: 101.0, quantity: 4.0 },
            ],
        }
    }

    fn cache(dir: &std::path::Path) -> SeriesCache {
        SeriesCache::new(dir, "BTCUSDT", Interval::default()).unwrap()
    }

    fn candles(n: usize) -> Vec<Candle> {
        let start = Utc::now().naive_utc() - chrono::Duration::hours(4 * (n as i64 - 1));
        (0..n)
            .map(|i| {
                let open_time = start + chrono::Duration::hours(4 * i as i64);
                Candle {
                    open_time,
                    open: 100.0,
                    high: 101.0,
                    low: 99.0,
                    close: 100.0,
                    volume: 1.0,
                    close_time: open_time + chrono::Duration::hours(4),
                }
            })
            .collect()
    }

    #[test]
    fn empty_anchor_input_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = FixedDepth::new(sample_depth());

        let rows = OrderBookFetcher::new(&cache, &source)
            .fetch_and_store(&[])
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn one_snapshot_per_candle_in_anchor_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = FixedDepth::new(sample_depth());
        let anchors = candles(7);

        let rows = OrderBookFetcher::new(&cache, &source)
            .with_request_spacing(Duration::ZERO)
            .with_concurrency(3)
            .fetch_and_store(&anchors)
            .unwrap();

        assert_eq!(rows.len(), 7);
        assert_eq!(source.calls.load(Ordering::SeqCst), 7);
        for (row, candle) in rows.iter().zip(&anchors) {
            assert_eq!(row.timestamp, candle.open_time);
        }
    }

    #[test]
    fn snapshot_reduces_to_top_of_book() {
        let ts = Utc::now().naive_utc();
        let row = snapshot_row(ts, &sample_depth());

        assert_eq!(row.bid_price_top, Some(99.5));
        assert_eq!(row.ask_price_top, Some(100.5));
        assert_eq!(row.bid_ask_spread, Some(1.0));
        assert_eq!(row.total_bid_volume, 5.0);
        assert_eq!(row.total_ask_volume, 5.5);
    }

    #[test]
    fn one_sided_book_leaves_spread_unset() {
        let ts = Utc::now().naive_utc();
        let depth = DepthSnapshot {
            bids: vec![],
            asks: vec![BookLevel { price: 100.5, quantity: 1.0 }],
        };
        let row = snapshot_row(ts, &depth);

        assert_eq!(row.bid_price_top, None);
        assert_eq!(row.bid_ask_spread, None);
        assert_eq!(row.total_bid_volume, 0.0);
        assert_eq!(row.total_ask_volume, 1.0);
    }

    #[test]
    fn fetch_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = FailingDepth;

        let err = OrderBookFetcher::new(&cache, &source)
            .with_request_spacing(Duration::ZERO)
            .fetch_and_store(&candles(2));

        assert!(matches!(err, Err(DataError::Network(_))));
    }

    #[test]
    fn fresh_cache_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = FixedDepth::new(sample_depth());
        let anchors = candles(2);

        let first = OrderBookFetcher::new(&cache, &source)
            .with_request_spacing(Duration::ZERO)
            .fetch_and_store(&anchors)
            .unwrap();
        let calls_after_first = source.calls.load(Ordering::SeqCst);

        let second = OrderBookFetcher::new(&cache, &source)
            .with_request_spacing(Duration::ZERO)
            .fetch_and_store(&anchors)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), calls_after_first);
    }
}
