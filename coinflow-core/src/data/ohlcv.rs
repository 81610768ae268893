//! OHLCV anchor fetcher: listing-date probe plus paged history download.
//!
//! The full history is rebuilt on every refresh: starting from the symbol's
//! earliest candle (resolved by probing from epoch 0), pages of up to 1000
//! candles are fetched with the cursor advanced to one millisecond past the
//! last close time, until a short or empty page signals exhaustion.

use crate::data::cache::SeriesCache;
use crate::data::provider::{DataError, KlineSource};
use crate::domain::{Candle, DataKind};
use tracing::{info, warn};

const MAX_PAGE_SIZE: usize = 1000;

pub struct OhlcvFetcher<'a> {
    cache: &'a SeriesCache,
    source: &'a dyn KlineSource,
    page_size: usize,
}

impl<'a> OhlcvFetcher<'a> {
    pub fn new(cache: &'a SeriesCache, source: &'a dyn KlineSource) -> Self {
        Self {
            cache,
            source,
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Override the page size (shrinks test fixtures).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Earliest available open time for the symbol, in epoch milliseconds.
    fn listing_open_time_ms(&self) -> Result<i64, DataError> {
        let symbol = self.cache.symbol();
        if !self.source.has_symbol(symbol)? {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let probe = self
            .source
            .fetch_klines(symbol, self.cache.interval(), 1, Some(0))?;
        let first = probe.first().ok_or_else(|| DataError::NoHistory {
            symbol: symbol.to_string(),
        })?;
        Ok(first.open_time.and_utc().timestamp_millis())
    }

    /// Return fresh cached candles, or download the full history.
    pub fn fetch_and_store(&self) -> Result<Vec<Candle>, DataError> {
        let (fresh, cached) = self.cache.check::<Candle>(DataKind::Ohlcv);
        if fresh {
            info!(records = cached.len(), "using local ohlcv data");
            return Ok(cached);
        }

        let symbol = self.cache.symbol();
        let mut cursor = self.listing_open_time_ms()?;
        let mut all: Vec<Candle> = Vec::new();

        loop {
            let page =
                self.source
                    .fetch_klines(symbol, self.cache.interval(), self.page_size, Some(cursor))?;
            let Some(last) = page.last() else {
                break;
            };
            let short_page = page.len() < self.page_size;
            cursor = last.close_time.and_utc().timestamp_millis() + 1;

            // Guard the persisted-table invariant against overlapping pages.
            for candle in page {
                match all.last() {
                    Some(prev) if candle.open_time <= prev.open_time => {}
                    _ => all.push(candle),
                }
            }

            if short_page {
                break;
            }
        }

        if all.is_empty() {
            warn!(symbol, "no ohlcv data returned");
            return Ok(all);
        }

        self.cache.save(DataKind::Ohlcv, &all)?;
        Ok(all)
    }
}
