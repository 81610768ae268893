//! Domain types: candles, intervals, series keys and per-source rows.

pub mod candle;
pub mod interval;
pub mod series;

pub use candle::Candle;
pub use interval::Interval;
pub use series::{
    CombinedRow, DataKind, FearGreedRow, FundamentalsRow, MacroRow, OnChainRow, OrderBookRow,
    SentimentRow, TechnicalRow, Timestamped,
};
