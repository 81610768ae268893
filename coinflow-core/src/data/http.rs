//! Shared blocking HTTP plumbing for the source clients.
//!
//! Every client uses the same 30-second timeout, browser user-agent, and
//! status-to-error mapping. Each call is attempted exactly once — there is
//! no retry or backoff in this pipeline.

use crate::data::provider::DataError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .expect("failed to build HTTP client")
}

/// Issue one GET and deserialize the JSON body.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<T, DataError> {
    let resp = client
        .get(url)
        .query(params)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| DataError::Network(e.to_string()))?;

    let status = resp.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(DataError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(DataError::AuthenticationRequired(format!(
            "{url} returned {status}"
        )));
    }

    if !status.is_success() {
        return Err(DataError::Http {
            status: status.as_u16(),
            endpoint: url.to_string(),
        });
    }

    resp.json::<T>()
        .map_err(|e| DataError::ResponseFormatChanged(format!("{url}: {e}")))
}

/// Parse a decimal string field from an API payload.
pub(crate) fn parse_decimal(value: &str, field: &str) -> Result<f64, DataError> {
    value
        .parse::<f64>()
        .map_err(|_| DataError::ResponseFormatChanged(format!("non-numeric {field}: {value:?}")))
}
