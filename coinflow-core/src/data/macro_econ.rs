//! Macro fetcher: daily index closes turned into simple returns on the grid.

use crate::data::cache::SeriesCache;
use crate::data::grid::{bucket_range, forward_fill};
use crate::data::provider::{DailyCloseSource, DataError};
use crate::domain::{DataKind, MacroRow};
use chrono::NaiveDateTime;
use tracing::{info, warn};

pub struct MacroFetcher<'a> {
    cache: &'a SeriesCache,
    source: &'a dyn DailyCloseSource,
    ticker: String,
}

impl<'a> MacroFetcher<'a> {
    pub fn new(cache: &'a SeriesCache, source: &'a dyn DailyCloseSource, ticker: &str) -> Self {
        Self {
            cache,
            source,
            ticker: ticker.to_string(),
        }
    }

    /// Return fresh cached rows, or fetch daily closes, compute simple
    /// returns, and forward-fill them onto the bucket grid.
    pub fn fetch_and_store(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<MacroRow>, DataError> {
        let (fresh, cached) = self.cache.check::<MacroRow>(DataKind::Macro);
        if fresh {
            info!(records = cached.len(), "using local macro data");
            return Ok(cached);
        }

        let closes = self
            .source
            .fetch_daily_closes(&self.ticker, start.date(), end.date())?;
        if closes.is_empty() {
            warn!(ticker = %self.ticker, "no macro data returned");
            return Ok(Vec::new());
        }

        // Simple returns; the first observation has no predecessor and is 0.
        let mut samples: Vec<(NaiveDateTime, f64)> = Vec::with_capacity(closes.len());
        for (i, close) in closes.iter().enumerate() {
            let ret = if i == 0 {
                0.0
            } else {
                (close.close - closes[i - 1].close) / closes[i - 1].close
            };
            samples.push((close.timestamp, ret));
        }

        let grid = bucket_range(start, end, self.cache.interval().duration());
        let rows: Vec<MacroRow> = forward_fill(&samples, &grid)
            .into_iter()
            .map(|(timestamp, sp500_returns)| MacroRow {
                timestamp,
                sp500_returns,
            })
            .collect();

        if rows.is_empty() {
            warn!(ticker = %self.ticker, "macro series does not overlap the requested range");
            return Ok(rows);
        }
        self.cache.save(DataKind::Macro, &rows)?;
        Ok(rows)
    }
}
