//! Technical-indicator fetcher: trailing-window features over anchor closes.
//!
//! Output rows align 1:1 with the anchor candles; wherever a window is
//! unfilled the column is left unset.

use crate::data::cache::SeriesCache;
use crate::data::provider::DataError;
use crate::domain::{Candle, DataKind, TechnicalRow};
use crate::indicators::{bollinger, macd, rsi, sma};
use tracing::{info, warn};

const SMA_FAST_PERIOD: usize = 50;
const SMA_SLOW_PERIOD: usize = 200;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_MULT: f64 = 2.0;

pub struct TechnicalFetcher<'a> {
    cache: &'a SeriesCache,
}

impl<'a> TechnicalFetcher<'a> {
    pub fn new(cache: &'a SeriesCache) -> Self {
        Self { cache }
    }

    /// Return fresh cached rows, or compute the indicator table from the
    /// anchor candles.
    pub fn fetch_and_store(&self, candles: &[Candle]) -> Result<Vec<TechnicalRow>, DataError> {
        let (fresh, cached) = self.cache.check::<TechnicalRow>(DataKind::Technical);
        if fresh {
            info!(records = cached.len(), "using local technical data");
            return Ok(cached);
        }

        if candles.is_empty() {
            warn!("no anchor candles provided for technical indicators");
            return Ok(Vec::new());
        }

        let rows = compute_indicator_rows(candles);
        self.cache.save(DataKind::Technical, &rows)?;
        Ok(rows)
    }
}

/// Compute the full indicator table for a candle sequence.
pub fn compute_indicator_rows(candles: &[Candle]) -> Vec<TechnicalRow> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let sma_fast = sma(&closes, SMA_FAST_PERIOD);
    let sma_slow = sma(&closes, SMA_SLOW_PERIOD);
    let rsi_series = rsi(&closes, RSI_PERIOD);
    let macd_series = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bands = bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_MULT);

    let defined = |v: f64| (!v.is_nan()).then_some(v);

    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| TechnicalRow {
            timestamp: candle.open_time,
            sma50: defined(sma_fast[i]),
            sma200: defined(sma_slow[i]),
            rsi: defined(rsi_series[i]),
            macd: defined(macd_series.macd[i]),
            macd_signal: defined(macd_series.signal[i]),
            upper_band: defined(bands.upper[i]),
            middle_band: defined(bands.middle[i]),
            lower_band: defined(bands.lower[i]),
        })
        .collect()
}
