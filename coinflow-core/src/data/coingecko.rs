//! CoinGecko market-chart client: daily market cap and traded volume.

use crate::data::http::{build_client, get_json};
use crate::data::provider::{DataError, MarketChartPoint, MarketChartSource};
use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(i64, f64)>,
    market_caps: Vec<(i64, f64)>,
    total_volumes: Vec<(i64, f64)>,
}

pub struct CoinGeckoClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }
}

impl MarketChartSource for CoinGeckoClient {
    fn fetch_market_chart(
        &self,
        coin_id: &str,
        days: i64,
    ) -> Result<Vec<MarketChartPoint>, DataError> {
        let url = format!("{}/coins/{coin_id}/market_chart", self.base_url);
        let params = [
            ("vs_currency", "usd".to_string()),
            ("days", days.to_string()),
            ("interval", "daily".to_string()),
        ];

        debug!(coin_id, days, "requesting market chart");
        let resp: MarketChartResponse = get_json(&self.client, &url, &params)?;

        // The three series share a timestamp axis; truncate to the shortest
        // in case the upstream returns ragged arrays.
        let n = resp
            .prices
            .len()
            .min(resp.market_caps.len())
            .min(resp.total_volumes.len());

        (0..n)
            .map(|i| {
                let (ms, _) = resp.prices[i];
                let timestamp = DateTime::from_timestamp_millis(ms)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| {
                        DataError::ResponseFormatChanged(format!("invalid timestamp: {ms}"))
                    })?;
                Ok(MarketChartPoint {
                    timestamp,
                    market_cap: resp.market_caps[i].1,
                    total_volume: resp.total_volumes[i].1,
                })
            })
            .collect()
    }
}
