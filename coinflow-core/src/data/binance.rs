//! Binance REST client: exchange metadata, klines, and depth snapshots.
//!
//! Kline payloads are arrays of mixed-type arrays; prices and volumes
//! arrive as decimal strings and are parsed into `f64` here so the rest of
//! the pipeline only sees typed candles.

use crate::data::http::{build_client, get_json, parse_decimal};
use crate::data::provider::{BookLevel, DataError, DepthSnapshot, DepthSource, KlineSource};
use crate::domain::{Candle, Interval};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

/// One kline as returned by `/api/v3/klines`:
/// open time, OHLCV strings, close time, quote volume, trade count,
/// taker volumes, and an unused trailing field.
type RawKline = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    i64,
    String,
    String,
    String,
);

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct DepthResponse {
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

/// Blocking client for the candle and depth endpoints.
pub struct BinanceClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }

    fn timestamp_from_ms(ms: i64) -> Result<NaiveDateTime, DataError> {
        DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ms}")))
    }

    fn candle_from_raw(raw: RawKline) -> Result<Candle, DataError> {
        let (open_ms, open, high, low, close, volume, close_ms, ..) = raw;
        Ok(Candle {
            open_time: Self::timestamp_from_ms(open_ms)?,
            open: parse_decimal(&open, "open")?,
            high: parse_decimal(&high, "high")?,
            low: parse_decimal(&low, "low")?,
            close: parse_decimal(&close, "close")?,
            volume: parse_decimal(&volume, "volume")?,
            close_time: Self::timestamp_from_ms(close_ms)?,
        })
    }
}

impl KlineSource for BinanceClient {
    fn has_symbol(&self, symbol: &str) -> Result<bool, DataError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let info: ExchangeInfo = get_json(&self.client, &url, &[])?;
        Ok(info.symbols.iter().any(|s| s.symbol == symbol))
    }

    fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
        start_time_ms: Option<i64>,
    ) -> Result<Vec<Candle>, DataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start_time_ms {
            params.push(("startTime", start.to_string()));
        }

        debug!(symbol, %interval, limit, ?start_time_ms, "requesting klines");
        let raw: Vec<RawKline> = get_json(&self.client, &url, &params)?;
        raw.into_iter().map(Self::candle_from_raw).collect()
    }
}

impl DepthSource for BinanceClient {
    fn fetch_depth(&self, symbol: &str, limit: usize) -> Result<DepthSnapshot, DataError> {
        let url = format!("{}/api/v3/depth", self.base_url);
        let params = [
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
        ];

        debug!(symbol, limit, "requesting depth snapshot");
        let resp: DepthResponse = get_json(&self.client, &url, &params)?;

        let parse_side = |levels: Vec<(String, String)>, side: &str| {
            levels
                .into_iter()
                .map(|(price, quantity)| {
                    Ok(BookLevel {
                        price: parse_decimal(&price, side)?,
                        quantity: parse_decimal(&quantity, side)?,
                    })
                })
                .collect::<Result<Vec<_>, DataError>>()
        };

        Ok(DepthSnapshot {
            bids: parse_side(resp.bids, "bid")?,
            asks: parse_side(resp.asks, "ask")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_from_raw_parses_decimal_strings() {
        let raw: RawKline = (
            1_700_000_000_000,
            "100.5".into(),
            "101.0".into(),
            "99.5".into(),
            "100.8".into(),
            "1234.5".into(),
            1_700_014_399_999,
            "0".into(),
            42,
            "0".into(),
            "0".into(),
            "0".into(),
        );
        let candle = BinanceClient::candle_from_raw(raw).unwrap();
        assert_eq!(candle.open, 100.5);
        assert_eq!(candle.close, 100.8);
        assert!(candle.close_time > candle.open_time);
    }

    #[test]
    fn candle_from_raw_rejects_bad_price() {
        let raw: RawKline = (
            1_700_000_000_000,
            "not-a-price".into(),
            "1".into(),
            "1".into(),
            "1".into(),
            "1".into(),
            1_700_014_399_999,
            "0".into(),
            0,
            "0".into(),
            "0".into(),
            "0".into(),
        );
        assert!(BinanceClient::candle_from_raw(raw).is_err());
    }

    #[test]
    fn kline_payload_deserializes_from_api_json() {
        let body = r#"[[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100",
            "148976.11427815",1499644799999,"2434.19055334",308,"1756.87402397",
            "28.46694368","17928899.62484339"]]"#;
        let raw: Vec<RawKline> = serde_json::from_str(body).unwrap();
        let candle = BinanceClient::candle_from_raw(raw.into_iter().next().unwrap()).unwrap();
        assert_eq!(candle.high, 0.8);
        assert_eq!(candle.volume, 148976.11427815);
    }
}
