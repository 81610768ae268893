//! Sentiment fetcher: compound polarity per bucket from a templated phrase.
//!
//! Placeholder integration: until a real social-text feed is wired in, the
//! score is computed from a synthetic template naming the asset, so every
//! bucket in a run carries the same value. The bucket layout and caching
//! behavior match what a genuine feed would produce.

use crate::data::cache::SeriesCache;
use crate::data::grid::bucket_range;
use crate::data::provider::DataError;
use crate::data::asset_from_symbol;
use crate::domain::{DataKind, SentimentRow};
use chrono::NaiveDateTime;
use tracing::info;

pub struct SentimentFetcher<'a> {
    cache: &'a SeriesCache,
}

impl<'a> SentimentFetcher<'a> {
    pub fn new(cache: &'a SeriesCache) -> Self {
        Self { cache }
    }

    /// Return fresh cached rows, or score every bucket in the range.
    pub fn fetch_and_store(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<SentimentRow>, DataError> {
        let (fresh, cached) = self.cache.check::<SentimentRow>(DataKind::Sentiment);
        if fresh {
            info!(records = cached.len(), "using local sentiment data");
            return Ok(cached);
        }

        let asset = asset_from_symbol(self.cache.symbol());
        let text = format!("{asset} price is stable");
        let score = polarity::compound(&text);

        let rows: Vec<SentimentRow> =
            bucket_range(start, end, self.cache.interval().duration())
                .into_iter()
                .map(|timestamp| SentimentRow {
                    timestamp,
                    social_sentiment: score,
                })
                .collect();

        if rows.is_empty() {
            return Ok(rows);
        }
        self.cache.save(DataKind::Sentiment, &rows)?;
        Ok(rows)
    }
}

/// Minimal lexicon-based polarity scoring.
///
/// Word valences are summed and squashed into (-1, 1) with the usual
/// compound normalization `s / sqrt(s^2 + 15)`.
pub mod polarity {
    const LEXICON: &[(&str, f64)] = &[
        ("bullish", 2.4),
        ("surge", 2.0),
        ("rally", 1.9),
        ("gain", 1.6),
        ("strong", 1.5),
        ("growth", 1.4),
        ("up", 1.0),
        ("stable", 0.8),
        ("steady", 0.7),
        ("down", -1.0),
        ("weak", -1.4),
        ("drop", -1.6),
        ("loss", -1.6),
        ("fear", -1.8),
        ("crash", -2.5),
        ("bearish", -2.4),
        ("collapse", -2.6),
    ];

    fn valence(word: &str) -> f64 {
        let normalized: String = word
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();
        LEXICON
            .iter()
            .find(|(w, _)| *w == normalized)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    /// Compound polarity of a phrase, in (-1, 1).
    pub fn compound(text: &str) -> f64 {
        let total: f64 = text.split_whitespace().map(valence).sum();
        total / (total * total + 15.0).sqrt()
    }

}
