//! CoinMetrics community client: daily transaction and active-address counts.

use crate::data::http::{build_client, get_json, parse_decimal};
use crate::data::provider::{AssetMetricsSource, ChainMetricsPoint, DataError};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    data: Vec<MetricsEntry>,
}

#[derive(Debug, Deserialize)]
struct MetricsEntry {
    time: String,
    #[serde(rename = "TxCnt")]
    tx_count: Option<String>,
    #[serde(rename = "AdrActCnt")]
    active_addresses: Option<String>,
}

pub struct CoinMetricsClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl CoinMetricsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }
}

impl AssetMetricsSource for CoinMetricsClient {
    fn fetch_chain_metrics(
        &self,
        asset: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ChainMetricsPoint>, DataError> {
        let url = format!("{}/timeseries/asset-metrics", self.base_url);
        let params = [
            ("assets", asset.to_string()),
            ("metrics", "TxCnt,AdrActCnt".to_string()),
            ("start_time", format!("{start}T00:00:00")),
            ("end_time", format!("{end}T23:59:59")),
            ("frequency", "1d".to_string()),
        ];

        debug!(asset, %start, %end, "requesting chain metrics");
        let resp: MetricsResponse = get_json(&self.client, &url, &params)?;

        let mut points = Vec::with_capacity(resp.data.len());
        for entry in resp.data {
            // Rows missing either metric are dropped, matching the
            // downstream expectation of a dense two-column series.
            let (Some(tx), Some(addr)) = (entry.tx_count, entry.active_addresses) else {
                continue;
            };
            let timestamp = DateTime::parse_from_rfc3339(&entry.time)
                .map_err(|e| {
                    DataError::ResponseFormatChanged(format!("bad time {:?}: {e}", entry.time))
                })?
                .naive_utc();
            points.push(ChainMetricsPoint {
                timestamp,
                tx_count: parse_decimal(&tx, "TxCnt")?,
                active_addresses: parse_decimal(&addr, "AdrActCnt")?,
            });
        }
        Ok(points)
    }
}
