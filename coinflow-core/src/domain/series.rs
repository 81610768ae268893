//! Series kinds and the typed row for each cached table.
//!
//! Every cached table is an ordered sequence of one of these row types,
//! keyed by its timestamp column (`open_time` for the anchor OHLCV series,
//! `timestamp` for everything else). Optional columns are `Option<f64>` and
//! serialize to empty CSV cells.

use super::candle::Candle;
use crate::data::provider::FailurePolicy;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The data type component of a series key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Ohlcv,
    OrderBook,
    Technical,
    Sentiment,
    FearGreed,
    Fundamentals,
    Macro,
    OnChain,
    Combined,
}

impl DataKind {
    /// File-name fragment for this kind, matching the on-disk layout
    /// `{SYMBOL}_{interval}_{kind}.csv`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Ohlcv => "ohlcv",
            DataKind::OrderBook => "orderbook",
            DataKind::Technical => "technical",
            DataKind::Sentiment => "sentiment",
            DataKind::FearGreed => "fear_greed",
            DataKind::Fundamentals => "fundamentals",
            DataKind::Macro => "macro",
            DataKind::OnChain => "onchain",
            DataKind::Combined => "combined",
        }
    }

    /// How a fetch failure for this kind affects the pipeline run.
    ///
    /// OHLCV is the anchor every other series depends on, so its failures
    /// abort the run; auxiliary sources degrade to "feature unavailable".
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            DataKind::Ohlcv => FailurePolicy::Fatal,
            _ => FailurePolicy::Degrade,
        }
    }

    /// The auxiliary kinds merged onto the anchor axis, in merge order.
    pub fn auxiliary() -> [DataKind; 7] {
        [
            DataKind::OrderBook,
            DataKind::Technical,
            DataKind::Sentiment,
            DataKind::FearGreed,
            DataKind::Fundamentals,
            DataKind::Macro,
            DataKind::OnChain,
        ]
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access to a row's primary timestamp, used for freshness checks and joins.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;
}

impl Timestamped for Candle {
    fn timestamp(&self) -> NaiveDateTime {
        self.open_time
    }
}

/// Top-of-book reduction of one depth snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookRow {
    pub timestamp: NaiveDateTime,
    pub bid_price_top: Option<f64>,
    pub bid_quantity_top: Option<f64>,
    pub ask_price_top: Option<f64>,
    pub ask_quantity_top: Option<f64>,
    pub bid_ask_spread: Option<f64>,
    pub total_bid_volume: f64,
    pub total_ask_volume: f64,
}

impl Timestamped for OrderBookRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Trailing-window indicators, aligned 1:1 with the anchor candles.
/// Unfilled windows are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalRow {
    pub timestamp: NaiveDateTime,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub upper_band: Option<f64>,
    pub middle_band: Option<f64>,
    pub lower_band: Option<f64>,
}

impl Timestamped for TechnicalRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Compound polarity score per bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRow {
    pub timestamp: NaiveDateTime,
    pub social_sentiment: f64,
}

impl Timestamped for SentimentRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Fear/greed index value per bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedRow {
    pub timestamp: NaiveDateTime,
    pub fear_greed_index: f64,
}

impl Timestamped for FearGreedRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Market cap and traded volume, forward-filled to the bucket grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRow {
    pub timestamp: NaiveDateTime,
    pub market_cap: f64,
    pub total_volume: f64,
}

impl Timestamped for FundamentalsRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Macro index simple returns, forward-filled to the bucket grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRow {
    pub timestamp: NaiveDateTime,
    pub sp500_returns: f64,
}

impl Timestamped for MacroRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Daily chain activity metrics, forward-filled to the bucket grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainRow {
    pub timestamp: NaiveDateTime,
    pub tx_volume: f64,
    pub active_addresses: f64,
}

impl Timestamped for OnChainRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// One row of the merged training table: the anchor candle plus every
/// auxiliary column that matched within the join tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub open_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,

    pub bid_price_top: Option<f64>,
    pub bid_quantity_top: Option<f64>,
    pub ask_price_top: Option<f64>,
    pub ask_quantity_top: Option<f64>,
    pub bid_ask_spread: Option<f64>,
    pub total_bid_volume: Option<f64>,
    pub total_ask_volume: Option<f64>,

    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub upper_band: Option<f64>,
    pub middle_band: Option<f64>,
    pub lower_band: Option<f64>,

    pub social_sentiment: Option<f64>,
    pub fear_greed_index: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub sp500_returns: Option<f64>,
    pub tx_volume: Option<f64>,
    pub active_addresses: Option<f64>,
}

impl CombinedRow {
    /// A combined row holding only the anchor candle's columns.
    pub fn from_candle(candle: &Candle) -> Self {
        Self {
            open_time: candle.open_time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            bid_price_top: None,
            bid_quantity_top: None,
            ask_price_top: None,
            ask_quantity_top: None,
            bid_ask_spread: None,
            total_bid_volume: None,
            total_ask_volume: None,
            sma50: None,
            sma200: None,
            rsi: None,
            macd: None,
            macd_signal: None,
            upper_band: None,
            middle_band: None,
            lower_band: None,
            social_sentiment: None,
            fear_greed_index: None,
            market_cap: None,
            total_volume: None,
            sp500_returns: None,
            tx_volume: None,
            active_addresses: None,
        }
    }
}

impl Timestamped for CombinedRow {
    fn timestamp(&self) -> NaiveDateTime {
        self.open_time
    }
}
