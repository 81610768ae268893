//! Fear/greed index client.
//!
//! The upstream ticker endpoint nests the index inside a keyed object and
//! serves it as either a number or a decimal string depending on the
//! listing, so extraction is value-based rather than a rigid struct.

use crate::data::http::{build_client, get_json};
use crate::data::provider::{DataError, FearGreedSource};
use serde_json::Value;
use tracing::debug;

pub struct AlternativeMeClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl AlternativeMeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }

    fn index_from_payload(payload: &Value) -> Result<f64, DataError> {
        let field = payload
            .pointer("/data/1/fear_greed")
            .ok_or_else(|| {
                DataError::ResponseFormatChanged("missing data.1.fear_greed".into())
            })?;
        match field {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| DataError::ResponseFormatChanged("non-finite index".into())),
            Value::String(s) => s.parse::<f64>().map_err(|_| {
                DataError::ResponseFormatChanged(format!("non-numeric index: {s:?}"))
            }),
            other => Err(DataError::ResponseFormatChanged(format!(
                "unexpected index value: {other}"
            ))),
        }
    }
}

impl FearGreedSource for AlternativeMeClient {
    fn fetch_current_index(&self) -> Result<f64, DataError> {
        let url = format!("{}/v2/ticker/Bitcoin/", self.base_url);
        debug!("requesting fear/greed index");
        let payload: Value = get_json(&self.client, &url, &[])?;
        Self::index_from_payload(&payload)
    }
}
