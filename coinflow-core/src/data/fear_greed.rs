//! Fear/greed fetcher: the current index broadcast across the range.
//!
//! Placeholder integration: the upstream endpoint exposes no usable history
//! for this series, so the single current value is replicated into every
//! bucket of the requested range.

use crate::data::cache::SeriesCache;
use crate::data::grid::bucket_range;
use crate::data::provider::{DataError, FearGreedSource};
use crate::domain::{DataKind, FearGreedRow};
use chrono::NaiveDateTime;
use tracing::info;

pub struct FearGreedFetcher<'a> {
    cache: &'a SeriesCache,
    source: &'a dyn FearGreedSource,
}

impl<'a> FearGreedFetcher<'a> {
    pub fn new(cache: &'a SeriesCache, source: &'a dyn FearGreedSource) -> Self {
        Self { cache, source }
    }

    /// Return fresh cached rows, or fetch the current index and broadcast
    /// it across every bucket in the range.
    pub fn fetch_and_store(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<FearGreedRow>, DataError> {
        let (fresh, cached) = self.cache.check::<FearGreedRow>(DataKind::FearGreed);
        if fresh {
            info!(records = cached.len(), "using local fear/greed data");
            return Ok(cached);
        }

        let index = self.source.fetch_current_index()?;
        let rows: Vec<FearGreedRow> =
            bucket_range(start, end, self.cache.interval().duration())
                .into_iter()
                .map(|timestamp| FearGreedRow {
                    timestamp,
                    fear_greed_index: index,
                })
                .collect();

        if rows.is_empty() {
            return Ok(rows);
        }
        self.cache.save(DataKind::FearGreed, &rows)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedIndex {
        value: f64,
        calls: AtomicUsize,
    }

    impl FearGreedSource for FixedIndex {
        fn fetch_current_index(&self) -> Result<f64, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }
    }

    struct UnavailableIndex;

    impl FearGreedSource for UnavailableIndex {
        fn fetch_current_index(&self) -> Result<f64, DataError> {
            Err(DataError::Http {
                status: 503,
                endpoint: "ticker".into(),
            })
        }
    }

    fn cache(dir: &std::path::Path) -> SeriesCache {
        SeriesCache::new(dir, "BTCUSDT", Interval::default()).unwrap()
    }

    #[test]
    fn three_bucket_range_yields_three_identical_rows() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = FixedIndex {
            value: 62.0,
            calls: AtomicUsize::new(0),
        };
        let end = Utc::now().naive_utc();
        let start = end - chrono::Duration::hours(8);

        let rows = FearGreedFetcher::new(&cache, &source)
            .fetch_and_store(start, end)
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.fear_greed_index == 62.0));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn upstream_failure_propagates_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let end = Utc::now().naive_utc();

        let err = FearGreedFetcher::new(&cache, &UnavailableIndex)
            .fetch_and_store(end - chrono::Duration::hours(4), end);

        assert!(matches!(err, Err(DataError::Http { status: 503, .. })));
        assert!(!cache.file_path(DataKind::FearGreed).exists());
    }

    #[test]
    fn fresh_cache_skips_the_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = FixedIndex {
            value: 40.0,
            calls: AtomicUsize::new(0),
        };
        let end = Utc::now().naive_utc();
        let fetcher = FearGreedFetcher::new(&cache, &source);

        fetcher.fetch_and_store(end - chrono::Duration::hours(4), end).unwrap();
        fetcher.fetch_and_store(end - chrono::Duration::hours(4), end).unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
