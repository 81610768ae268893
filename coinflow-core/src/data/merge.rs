//! As-of merge: every cached auxiliary series nearest-joined onto the
//! anchor axis.
//!
//! The anchor OHLCV table defines the row set; each auxiliary table
//! contributes its columns wherever it has a row within one bucket width of
//! the anchor timestamp. Sources with a missing, corrupt, or empty file are
//! skipped with a warning, never an error.

use crate::data::cache::SeriesCache;
use crate::data::grid::nearest_within;
use crate::data::provider::DataError;
use crate::domain::{
    Candle, CombinedRow, DataKind, FearGreedRow, FundamentalsRow, MacroRow, OnChainRow,
    OrderBookRow, SentimentRow, TechnicalRow, Timestamped,
};
use chrono::Duration;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Build the combined training table from the cached series.
///
/// Deterministic over the cache contents: repeated merges with no refresh
/// in between produce identical output.
pub fn merge_series(cache: &SeriesCache) -> Result<Vec<CombinedRow>, DataError> {
    let Some(mut candles) = cache.load::<Candle>(DataKind::Ohlcv) else {
        warn!(symbol = cache.symbol(), "no anchor data available to merge");
        return Ok(Vec::new());
    };
    candles.sort_by_key(|c| c.open_time);

    let mut combined: Vec<CombinedRow> = candles.iter().map(CombinedRow::from_candle).collect();
    let tolerance = cache.interval().duration();

    join_onto::<OrderBookRow>(cache, DataKind::OrderBook, &mut combined, tolerance, |row, aux| {
        row.bid_price_top = aux.bid_price_top;
        row.bid_quantity_top = aux.bid_quantity_top;
        row.ask_price_top = aux.ask_price_top;
        row.ask_quantity_top = aux.ask_quantity_top;
        row.bid_ask_spread = aux.bid_ask_spread;
        row.total_bid_volume = Some(aux.total_bid_volume);
        row.total_ask_volume = Some(aux.total_ask_volume);
    });
    join_onto::<TechnicalRow>(cache, DataKind::Technical, &mut combined, tolerance, |row, aux| {
        row.sma50 = aux.sma50;
        row.sma200 = aux.sma200;
        row.rsi = aux.rsi;
        row.macd = aux.macd;
        row.macd_signal = aux.macd_signal;
        row.upper_band = aux.upper_band;
        row.middle_band = aux.middle_band;
        row.lower_band = aux.lower_band;
    });
    join_onto::<SentimentRow>(cache, DataKind::Sentiment, &mut combined, tolerance, |row, aux| {
        row.social_sentiment = Some(aux.social_sentiment);
    });
    join_onto::<FearGreedRow>(cache, DataKind::FearGreed, &mut combined, tolerance, |row, aux| {
        row.fear_greed_index = Some(aux.fear_greed_index);
    });
    join_onto::<FundamentalsRow>(cache, DataKind::Fundamentals, &mut combined, tolerance, |row, aux| {
        row.market_cap = Some(aux.market_cap);
        row.total_volume = Some(aux.total_volume);
    });
    join_onto::<MacroRow>(cache, DataKind::Macro, &mut combined, tolerance, |row, aux| {
        row.sp500_returns = Some(aux.sp500_returns);
    });
    join_onto::<OnChainRow>(cache, DataKind::OnChain, &mut combined, tolerance, |row, aux| {
        row.tx_volume = Some(aux.tx_volume);
        row.active_addresses = Some(aux.active_addresses);
    });

    Ok(combined)
}

/// Nearest-join one auxiliary table onto the combined rows.
fn join_onto<T>(
    cache: &SeriesCache,
    kind: DataKind,
    combined: &mut [CombinedRow],
    tolerance: Duration,
    mut assign: impl FnMut(&mut CombinedRow, &T),
) where
    T: DeserializeOwned + Timestamped,
{
    let Some(mut rows) = cache.load::<T>(kind) else {
        warn!(%kind, symbol = cache.symbol(), "series unavailable, skipping in merge");
        return;
    };
    rows.sort_by_key(|r| r.timestamp());
    let stamps: Vec<_> = rows.iter().map(|r| r.timestamp()).collect();

    for row in combined.iter_mut() {
        if let Some(idx) = nearest_within(row.open_time, &stamps, tolerance) {
            assign(row, &rows[idx]);
        }
    }
}
