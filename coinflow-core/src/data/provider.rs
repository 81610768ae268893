//! Source traits and structured error types.
//!
//! Each upstream API sits behind a narrow trait so the fetch logic can be
//! exercised against mocks. The cache layer sits above these traits —
//! sources know nothing about the cache.

use crate::domain::{Candle, Interval};
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Structured error types for pipeline operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no history available for symbol '{symbol}'")]
    NoHistory { symbol: String },

    #[error("http {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("stream error: {0}")]
    Stream(String),
}

/// How a fetch failure for one source affects the whole pipeline run.
///
/// `Fatal` propagates the error to the caller; `Degrade` logs it and
/// continues with the source treated as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Fatal,
    Degrade,
}

/// Candle endpoint plus the exchange-metadata probe.
pub trait KlineSource: Send + Sync {
    /// Whether the exchange lists the symbol at all.
    fn has_symbol(&self, symbol: &str) -> Result<bool, DataError>;

    /// Fetch up to `limit` candles, optionally starting from a millisecond
    /// timestamp. Candles are returned in increasing `open_time` order.
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
        start_time_ms: Option<i64>,
    ) -> Result<Vec<Candle>, DataError>;
}

/// One price level of a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Raw depth snapshot, best levels first on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Depth-snapshot endpoint.
pub trait DepthSource: Send + Sync {
    fn fetch_depth(&self, symbol: &str, limit: usize) -> Result<DepthSnapshot, DataError>;
}

/// One day of the market-chart series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketChartPoint {
    pub timestamp: NaiveDateTime,
    pub market_cap: f64,
    pub total_volume: f64,
}

/// Market-chart endpoint keyed by coin id.
pub trait MarketChartSource: Send + Sync {
    fn fetch_market_chart(
        &self,
        coin_id: &str,
        days: i64,
    ) -> Result<Vec<MarketChartPoint>, DataError>;
}

/// Fear/greed index endpoint. The upstream exposes only a current value.
pub trait FearGreedSource: Send + Sync {
    fn fetch_current_index(&self) -> Result<f64, DataError>;
}

/// One daily close of an index ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyClose {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

/// Daily-price-history endpoint for macro tickers.
pub trait DailyCloseSource: Send + Sync {
    fn fetch_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, DataError>;
}

/// One day of chain activity metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainMetricsPoint {
    pub timestamp: NaiveDateTime,
    pub tx_count: f64,
    pub active_addresses: f64,
}

/// Timeseries asset-metrics endpoint.
pub trait AssetMetricsSource: Send + Sync {
    fn fetch_chain_metrics(
        &self,
        asset: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ChainMetricsPoint>, DataError>;
}
