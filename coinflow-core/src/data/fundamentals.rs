//! Fundamentals fetcher: daily market cap and volume on the bucket grid.

use crate::data::asset_from_symbol;
use crate::data::cache::SeriesCache;
use crate::data::grid::{bucket_range, forward_fill};
use crate::data::provider::{DataError, MarketChartSource};
use crate::domain::{DataKind, FundamentalsRow};
use chrono::NaiveDateTime;
use tracing::{info, warn};

pub struct FundamentalsFetcher<'a> {
    cache: &'a SeriesCache,
    source: &'a dyn MarketChartSource,
}

impl<'a> FundamentalsFetcher<'a> {
    pub fn new(cache: &'a SeriesCache, source: &'a dyn MarketChartSource) -> Self {
        Self { cache, source }
    }

    /// Return fresh cached rows, or fetch the daily series and forward-fill
    /// it onto the bucket grid, clipped to the range.
    pub fn fetch_and_store(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<FundamentalsRow>, DataError> {
        let (fresh, cached) = self.cache.check::<FundamentalsRow>(DataKind::Fundamentals);
        if fresh {
            info!(records = cached.len(), "using local fundamentals data");
            return Ok(cached);
        }

        let coin = asset_from_symbol(self.cache.symbol());
        let days = (end.date() - start.date()).num_days() + 1;
        let points = self.source.fetch_market_chart(&coin, days)?;
        if points.is_empty() {
            warn!(coin = %coin, "no fundamentals data returned");
            return Ok(Vec::new());
        }

        let mut samples: Vec<(NaiveDateTime, (f64, f64))> = points
            .iter()
            .map(|p| (p.timestamp, (p.market_cap, p.total_volume)))
            .collect();
        samples.sort_by_key(|(ts, _)| *ts);

        let grid = bucket_range(start, end, self.cache.interval().duration());
        let rows: Vec<FundamentalsRow> = forward_fill(&samples, &grid)
            .into_iter()
            .map(|(timestamp, (market_cap, total_volume))| FundamentalsRow {
                timestamp,
                market_cap,
                total_volume,
            })
            .collect();

        if rows.is_empty() {
            warn!(coin = %coin, "fundamentals series does not overlap the requested range");
            return Ok(rows);
        }
        self.cache.save(DataKind::Fundamentals, &rows)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::MarketChartPoint;
    use crate::domain::Interval;
    use chrono::Utc;

    struct FixedChart {
        points: Vec<MarketChartPoint>,
    }

    impl MarketChartSource for FixedChart {
        fn fetch_market_chart(
            &self,
            _coin_id: &str,
            _days: i64,
        ) -> Result<Vec<MarketChartPoint>, DataError> {
            Ok(self.points.clone())
        }
    }

    #[test]
    fn daily_samples_forward_fill_the_four_hour_grid() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), "BTCUSDT", Interval::default()).unwrap();
        let end = Utc::now().naive_utc();
        let start = end - chrono::Duration::days(1);
        let source = FixedChart {
            points: vec![
                MarketChartPoint {
                    timestamp: start,
                    market_cap: 8.0e11,
                    total_volume: 2.0e10,
                },
                MarketChartPoint {
                    timestamp: start + chrono::Duration::days(1),
                    market_cap: 8.1e11,
                    total_volume: 2.1e10,
                },
            ],
        };

        let rows = FundamentalsFetcher::new(&cache, &source)
            .fetch_and_store(start, end)
            .unwrap();

        // one day at 4h buckets, inclusive ends
        assert_eq!(rows.len(), 7);
        assert!(rows[..6].iter().all(|r| r.market_cap == 8.0e11));
        assert_eq!(rows[6].market_cap, 8.1e11);
    }

    #[test]
    fn empty_upstream_series_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path(), "BTCUSDT", Interval::default()).unwrap();
        let end = Utc::now().naive_utc();
        let source = FixedChart { points: vec![] };

        let rows = FundamentalsFetcher::new(&cache, &source)
            .fetch_and_store(end - chrono::Duration::hours(8), end)
            .unwrap();

        assert!(rows.is_empty());
        assert!(!cache.file_path(DataKind::Fundamentals).exists());
    }
}
