//! TOML configuration: cache directory and upstream API endpoints.

use crate::data::provider::DataError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_paths: DataPaths,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Filesystem layout for cached series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Directory holding one flat CSV file per (symbol, interval, kind).
    pub raw: PathBuf,
}

/// Upstream endpoints. Overridable so tests and the CLI can point at
/// local fixtures instead of the public APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub binance_url: String,
    pub binance_ws_url: String,
    pub coingecko_url: String,
    pub fear_greed_url: String,
    pub yahoo_url: String,
    pub coinmetrics_url: String,
    /// Ticker for the macro index series.
    pub macro_ticker: String,
    /// Minimum spacing between depth-snapshot requests, in milliseconds.
    pub request_spacing_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            binance_url: "https://api.binance.com".into(),
            binance_ws_url: "wss://stream.binance.com:9443/ws".into(),
            coingecko_url: "https://api.coingecko.com/api/v3".into(),
            fear_greed_url: "https://api.alternative.me".into(),
            yahoo_url: "https://query2.finance.yahoo.com".into(),
            coinmetrics_url: "https://community-api.coinmetrics.io/v4".into(),
            macro_ticker: "^GSPC".into(),
            request_spacing_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_paths: DataPaths {
                raw: PathBuf::from("data/raw"),
            },
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| DataError::Config(format!("parse {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
            [data_paths]
            raw = "cache/raw"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.data_paths.raw, PathBuf::from("cache/raw"));
        assert_eq!(config.api.binance_url, "https://api.binance.com");
    }

    #[test]
    fn api_overrides_apply() {
        let toml = r#"
            [data_paths]
            raw = "data/raw"

            [api]
            binance_url = "http://localhost:9000"
            macro_ticker = "^NDX"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.binance_url, "http://localhost:9000");
        assert_eq!(config.api.macro_ticker, "^NDX");
        // untouched fields keep their defaults
        assert_eq!(config.api.coingecko_url, "https://api.coingecko.com/api/v3");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/coinflow.toml")).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }
}
