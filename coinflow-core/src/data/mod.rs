//! Data ingestion: cache, source clients, fetchers, and the merge.

pub mod alternative_me;
pub mod binance;
pub mod cache;
pub mod coingecko;
pub mod coinmetrics;
pub mod fear_greed;
pub mod fundamentals;
pub mod grid;
mod http;
pub mod macro_econ;
pub mod manager;
pub mod merge;
pub mod ohlcv;
pub mod onchain;
pub mod orderbook;
pub mod provider;
pub mod sentiment;
pub mod technical;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, SeriesCache};
pub use manager::{DataManager, Sources};
pub use provider::{DataError, FailurePolicy};

/// Base asset id derived from a trading pair: the quote suffix is stripped
/// and the remainder lowercased (`BTCUSDT` → `btc`).
pub(crate) fn asset_from_symbol(symbol: &str) -> String {
    symbol
        .strip_suffix("USDT")
        .unwrap_or(symbol)
        .to_lowercase()
}
