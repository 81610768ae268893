//! Coinflow Core — freshness-aware fetch-and-cache pipeline for crypto market data.
//!
//! This crate contains the heart of the ingestion pipeline:
//! - Domain types (candles, intervals, per-source series rows)
//! - Flat-file series cache with staleness checks and atomic overwrites
//! - Source clients for the candle, depth, market-chart, fear/greed,
//!   daily-close, and chain-metrics APIs
//! - Per-source fetchers (cache read-through, fetch, normalize, write-through)
//! - The manager that orchestrates fetchers and builds the combined
//!   training table via a tolerance-bounded nearest join
//! - Trailing-window indicators computed over close-price sequences
//! - A cancellable live trade subscription

pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod stream;

pub use config::Config;
pub use data::manager::DataManager;
pub use data::provider::{DataError, FailurePolicy};
pub use domain::{Candle, DataKind, Interval};
