//! Flat-file series cache with freshness checks.
//!
//! Layout: `{raw_dir}/{SYMBOL}_{interval}_{kind}.csv`, one file per series
//! key, plus a JSON metadata sidecar per file (row count, time range,
//! blake3 content hash). The sidecar is informational only — freshness is
//! always decided from the table's own timestamp column.
//!
//! Writes are atomic (write to .tmp, rename into place) and always replace
//! the whole file. A corrupt or truncated file is logged and treated as
//! absent data, which triggers a full refetch upstream.

use crate::data::provider::DataError;
use crate::domain::{DataKind, Interval, Timestamped};
use chrono::{NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Maximum age of the newest row for a table to be served from cache.
/// Fixed at the default bucket width regardless of the configured interval.
fn freshness_window() -> chrono::Duration {
    chrono::Duration::hours(4)
}

/// Metadata sidecar for a cached series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub interval: String,
    pub kind: DataKind,
    pub row_count: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub data_hash: String,
    pub written_at: NaiveDateTime,
}

/// Cache presence summary for one kind, used by status reporting.
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub kind: DataKind,
    pub cached: bool,
    pub row_count: Option<usize>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Per-(symbol, interval) view of the flat-file store.
pub struct SeriesCache {
    dir: PathBuf,
    symbol: String,
    interval: Interval,
}

impl SeriesCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        symbol: &str,
        interval: Interval,
    ) -> Result<Self, DataError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Cache(format!("create {}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            symbol: symbol.to_uppercase(),
            interval,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn file_path(&self, kind: DataKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{kind}.csv", self.symbol, self.interval))
    }

    fn meta_path(&self, kind: DataKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{kind}.meta.json", self.symbol, self.interval))
    }

    /// Check whether a fresh table exists for `kind`.
    ///
    /// Returns `(true, rows)` when the file parses and its newest timestamp
    /// is within the freshness window; `(false, empty)` when the file is
    /// absent, unreadable, empty, or stale.
    pub fn check<T>(&self, kind: DataKind) -> (bool, Vec<T>)
    where
        T: DeserializeOwned + Timestamped,
    {
        let path = self.file_path(kind);
        let Some(rows) = self.read_rows::<T>(kind, &path) else {
            return (false, Vec::new());
        };

        let newest = rows
            .iter()
            .map(|r| r.timestamp())
            .max()
            .expect("read_rows returns non-empty");
        let age = Utc::now().naive_utc() - newest;
        if age < freshness_window() {
            info!(%kind, path = %path.display(), "local data is up to date");
            (true, rows)
        } else {
            info!(%kind, path = %path.display(), "local data is outdated");
            (false, Vec::new())
        }
    }

    /// Load a cached table regardless of freshness (used by the merge).
    /// Absent, corrupt, or empty files all read as `None`.
    pub fn load<T>(&self, kind: DataKind) -> Option<Vec<T>>
    where
        T: DeserializeOwned + Timestamped,
    {
        let path = self.file_path(kind);
        self.read_rows(kind, &path)
    }

    fn read_rows<T: DeserializeOwned>(&self, kind: DataKind, path: &Path) -> Option<Vec<T>> {
        if !path.exists() {
            info!(%kind, path = %path.display(), "no local data found");
            return None;
        }
        let mut reader = match csv::Reader::from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(%kind, path = %path.display(), error = %e, "unreadable cache file, treating as absent");
                return None;
            }
        };
        let mut rows = Vec::new();
        for record in reader.deserialize::<T>() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(%kind, path = %path.display(), error = %e, "corrupt cache file, treating as absent");
                    return None;
                }
            }
        }
        if rows.is_empty() {
            info!(%kind, path = %path.display(), "empty local data");
            return None;
        }
        Some(rows)
    }

    /// Persist a table, overwriting any prior content. Warns and no-ops on
    /// empty input.
    pub fn save<T>(&self, kind: DataKind, rows: &[T]) -> Result<(), DataError>
    where
        T: Serialize + Timestamped,
    {
        if rows.is_empty() {
            warn!(%kind, symbol = %self.symbol, "no data to save");
            return Ok(());
        }

        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in rows {
            wtr.serialize(row)
                .map_err(|e| DataError::Cache(format!("serialize {kind}: {e}")))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| DataError::Cache(format!("serialize {kind}: {e}")))?;

        let path = self.file_path(kind);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, &bytes)
            .map_err(|e| DataError::Cache(format!("write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed: {e}"))
        })?;

        let timestamps: Vec<NaiveDateTime> = rows.iter().map(|r| r.timestamp()).collect();
        let meta = CacheMeta {
            symbol: self.symbol.clone(),
            interval: self.interval.to_string(),
            kind,
            row_count: rows.len(),
            start: *timestamps.iter().min().expect("non-empty"),
            end: *timestamps.iter().max().expect("non-empty"),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            written_at: Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Cache(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(kind), meta_json)
            .map_err(|e| DataError::Cache(format!("meta write: {e}")))?;

        info!(%kind, path = %path.display(), records = rows.len(), "saved data");
        Ok(())
    }

    /// Read the metadata sidecar for a kind, if present and parsable.
    pub fn meta(&self, kind: DataKind) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(kind)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Presence summary across every kind, for status reporting.
    pub fn status(&self) -> Vec<CacheStatus> {
        let mut kinds = vec![DataKind::Ohlcv];
        kinds.extend(DataKind::auxiliary());
        kinds.push(DataKind::Combined);

        kinds
            .into_iter()
            .map(|kind| {
                let meta = self.meta(kind);
                CacheStatus {
                    kind,
                    cached: self.file_path(kind).exists(),
                    row_count: meta.as_ref().map(|m| m.row_count),
                    start: meta.as_ref().map(|m| m.start),
                    end: meta.as_ref().map(|m| m.end),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SentimentRow;

    fn cache(dir: &Path) -> SeriesCache {
        SeriesCache::new(dir, "btcusdt", Interval::default()).unwrap()
    }

    fn rows_ending_at(end: NaiveDateTime, n: usize) -> Vec<SentimentRow> {
        (0..n)
            .map(|i| SentimentRow {
                timestamp: end - chrono::Duration::hours(4 * (n - 1 - i) as i64),
                social_sentiment: 0.25,
            })
            .collect()
    }

    #[test]
    fn absent_file_reads_as_stale_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (fresh, rows) = cache(dir.path()).check::<SentimentRow>(DataKind::Sentiment);
        assert!(!fresh);
        assert!(rows.is_empty());
    }

    #[test]
    fn fresh_rows_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let rows = rows_ending_at(Utc::now().naive_utc(), 3);
        cache.save(DataKind::Sentiment, &rows).unwrap();

        let (fresh, loaded) = cache.check::<SentimentRow>(DataKind::Sentiment);
        assert!(fresh);
        assert_eq!(loaded, rows);
    }

    #[test]
    fn stale_rows_read_as_stale_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let rows = rows_ending_at(Utc::now().naive_utc() - chrono::Duration::hours(10), 3);
        cache.save(DataKind::Sentiment, &rows).unwrap();

        let (fresh, loaded) = cache.check::<SentimentRow>(DataKind::Sentiment);
        assert!(!fresh);
        assert!(loaded.is_empty());

        // the merge path still sees the stale table
        assert_eq!(cache.load::<SentimentRow>(DataKind::Sentiment).unwrap().len(), 3);
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        fs::write(
            cache.file_path(DataKind::Sentiment),
            "timestamp,social_sentiment\ngarbage,not-a-number\n",
        )
        .unwrap();

        let (fresh, rows) = cache.check::<SentimentRow>(DataKind::Sentiment);
        assert!(!fresh);
        assert!(rows.is_empty());
        assert!(cache.load::<SentimentRow>(DataKind::Sentiment).is_none());
    }

    #[test]
    fn empty_save_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        cache.save::<SentimentRow>(DataKind::Sentiment, &[]).unwrap();
        assert!(!cache.file_path(DataKind::Sentiment).exists());
    }

    #[test]
    fn save_overwrites_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let now = Utc::now().naive_utc();
        cache.save(DataKind::Sentiment, &rows_ending_at(now, 5)).unwrap();
        cache.save(DataKind::Sentiment, &rows_ending_at(now, 2)).unwrap();

        let (_, rows) = cache.check::<SentimentRow>(DataKind::Sentiment);
        assert_eq!(rows.len(), 2);
        assert_eq!(cache.meta(DataKind::Sentiment).unwrap().row_count, 2);
    }

    #[test]
    fn meta_sidecar_describes_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let now = Utc::now().naive_utc();
        let rows = rows_ending_at(now, 4);
        cache.save(DataKind::Sentiment, &rows).unwrap();

        let meta = cache.meta(DataKind::Sentiment).unwrap();
        assert_eq!(meta.symbol, "BTCUSDT");
        assert_eq!(meta.row_count, 4);
        assert_eq!(meta.start, rows[0].timestamp);
        assert_eq!(meta.end, rows[3].timestamp);
        assert_eq!(meta.data_hash.len(), 64);
    }

    #[test]
    fn status_reports_presence_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        cache
            .save(DataKind::Sentiment, &rows_ending_at(Utc::now().naive_utc(), 1))
            .unwrap();

        let status = cache.status();
        let sentiment = status.iter().find(|s| s.kind == DataKind::Sentiment).unwrap();
        assert!(sentiment.cached);
        assert_eq!(sentiment.row_count, Some(1));
        let ohlcv = status.iter().find(|s| s.kind == DataKind::Ohlcv).unwrap();
        assert!(!ohlcv.cached);
    }
}
