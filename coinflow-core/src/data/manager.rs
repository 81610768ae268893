//! Pipeline orchestration: anchor first, auxiliaries as independent
//! failure domains, then the as-of merge into the combined table.

use crate::config::{ApiConfig, Config};
use crate::data::alternative_me::AlternativeMeClient;
use crate::data::binance::BinanceClient;
use crate::data::cache::SeriesCache;
use crate::data::coingecko::CoinGeckoClient;
use crate::data::coinmetrics::CoinMetricsClient;
use crate::data::fear_greed::FearGreedFetcher;
use crate::data::fundamentals::FundamentalsFetcher;
use crate::data::macro_econ::MacroFetcher;
use crate::data::merge::merge_series;
use crate::data::ohlcv::OhlcvFetcher;
use crate::data::onchain::OnChainFetcher;
use crate::data::orderbook::OrderBookFetcher;
use crate::data::provider::{
    AssetMetricsSource, DailyCloseSource, DataError, DepthSource, FailurePolicy, FearGreedSource,
    KlineSource, MarketChartSource,
};
use crate::data::sentiment::SentimentFetcher;
use crate::data::technical::TechnicalFetcher;
use crate::data::yahoo::YahooClient;
use crate::domain::{CombinedRow, DataKind, Interval};
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, warn};

/// The upstream collaborators, one per external API.
pub struct Sources {
    pub klines: Box<dyn KlineSource>,
    pub depth: Box<dyn DepthSource>,
    pub market_chart: Box<dyn MarketChartSource>,
    pub fear_greed: Box<dyn FearGreedSource>,
    pub daily_closes: Box<dyn DailyCloseSource>,
    pub chain_metrics: Box<dyn AssetMetricsSource>,
}

impl Sources {
    /// Live clients against the configured public endpoints.
    pub fn live(api: &ApiConfig) -> Self {
        Self {
            klines: Box::new(BinanceClient::new(&api.binance_url)),
            depth: Box::new(BinanceClient::new(&api.binance_url)),
            market_chart: Box::new(CoinGeckoClient::new(&api.coingecko_url)),
            fear_greed: Box::new(AlternativeMeClient::new(&api.fear_greed_url)),
            daily_closes: Box::new(YahooClient::new(&api.yahoo_url)),
            chain_metrics: Box::new(CoinMetricsClient::new(&api.coinmetrics_url)),
        }
    }
}

pub struct DataManager {
    cache: SeriesCache,
    sources: Sources,
    macro_ticker: String,
    request_spacing: Duration,
}

impl DataManager {
    pub fn new(config: &Config, symbol: &str, interval: Interval) -> Result<Self, DataError> {
        let sources = Sources::live(&config.api);
        Self::with_sources(config, symbol, interval, sources)
    }

    /// Construct against explicit sources (mocked in tests).
    pub fn with_sources(
        config: &Config,
        symbol: &str,
        interval: Interval,
        sources: Sources,
    ) -> Result<Self, DataError> {
        let cache = SeriesCache::new(config.data_paths.raw.clone(), symbol, interval)?;
        info!(symbol = cache.symbol(), %interval, "data manager initialized");
        Ok(Self {
            cache,
            sources,
            macro_ticker: config.api.macro_ticker.clone(),
            request_spacing: Duration::from_millis(config.api.request_spacing_ms),
        })
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Fetch and store every series.
    ///
    /// The anchor series runs first under its `Fatal` policy; an empty
    /// anchor aborts the run (logged, not raised) since no range exists for
    /// the auxiliary sources, each of which then runs under `Degrade`.
    pub fn fetch_and_store_all(&self) -> Result<(), DataError> {
        let anchor = OhlcvFetcher::new(&self.cache, self.sources.klines.as_ref()).fetch_and_store();
        let Some(candles) = apply_policy(DataKind::Ohlcv, anchor)? else {
            return Ok(());
        };
        if candles.is_empty() {
            warn!("no anchor data available, skipping auxiliary sources");
            return Ok(());
        }

        let start = candles
            .iter()
            .map(|c| c.open_time)
            .min()
            .expect("candles is non-empty");
        let end = Utc::now().naive_utc();

        apply_policy(
            DataKind::OrderBook,
            OrderBookFetcher::new(&self.cache, self.sources.depth.as_ref())
                .with_request_spacing(self.request_spacing)
                .fetch_and_store(&candles),
        )?;
        apply_policy(
            DataKind::Technical,
            TechnicalFetcher::new(&self.cache).fetch_and_store(&candles),
        )?;
        apply_policy(
            DataKind::Sentiment,
            SentimentFetcher::new(&self.cache).fetch_and_store(start, end),
        )?;
        apply_policy(
            DataKind::FearGreed,
            FearGreedFetcher::new(&self.cache, self.sources.fear_greed.as_ref())
                .fetch_and_store(start, end),
        )?;
        apply_policy(
            DataKind::Fundamentals,
            FundamentalsFetcher::new(&self.cache, self.sources.market_chart.as_ref())
                .fetch_and_store(start, end),
        )?;
        apply_policy(
            DataKind::Macro,
            MacroFetcher::new(&self.cache, self.sources.daily_closes.as_ref(), &self.macro_ticker)
                .fetch_and_store(start, end),
        )?;
        apply_policy(
            DataKind::OnChain,
            OnChainFetcher::new(&self.cache, self.sources.chain_metrics.as_ref())
                .fetch_and_store(start, end),
        )?;

        info!(symbol = self.cache.symbol(), "completed fetching all series");
        Ok(())
    }

    /// Merge every cached series into the combined training table, persist
    /// it under its own kind, and return it.
    pub fn merge_for_training(&self) -> Result<Vec<CombinedRow>, DataError> {
        let combined = merge_series(&self.cache)?;
        if combined.is_empty() {
            warn!(symbol = self.cache.symbol(), "no data available to merge");
            return Ok(combined);
        }
        self.cache.save(DataKind::Combined, &combined)?;
        info!(records = combined.len(), "saved combined training table");
        Ok(combined)
    }
}

/// Resolve a fetch result against the kind's failure policy.
fn apply_policy<T>(
    kind: DataKind,
    result: Result<Vec<T>, DataError>,
) -> Result<Option<Vec<T>>, DataError> {
    match result {
        Ok(rows) => {
            info!(%kind, records = rows.len(), "series fetched");
            Ok(Some(rows))
        }
        Err(e) => match kind.failure_policy() {
            FailurePolicy::Fatal => {
                error!(%kind, error = %e, "anchor fetch failed, aborting run");
                Err(e)
            }
            FailurePolicy::Degrade => {
                warn!(%kind, error = %e, "auxiliary fetch failed, continuing");
                Ok(None)
            }
        },
    }
}
