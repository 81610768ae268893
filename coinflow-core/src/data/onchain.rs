//! On-chain fetcher: daily chain activity metrics on the bucket grid.

use crate::data::asset_from_symbol;
use crate::data::cache::SeriesCache;
use crate::data::grid::{bucket_range, forward_fill};
use crate::data::provider::{AssetMetricsSource, DataError};
use crate::domain::{DataKind, OnChainRow};
use chrono::NaiveDateTime;
use tracing::{info, warn};

pub struct OnChainFetcher<'a> {
    cache: &'a SeriesCache,
    source: &'a dyn AssetMetricsSource,
}

impl<'a> OnChainFetcher<'a> {
    pub fn new(cache: &'a SeriesCache, source: &'a dyn AssetMetricsSource) -> Self {
        Self { cache, source }
    }

    fn asset(&self) -> String {
        let symbol = self.cache.symbol();
        if symbol.contains("BTC") {
            "btc".to_string()
        } else {
            asset_from_symbol(symbol)
        }
    }

    /// Return fresh cached rows, or fetch the daily metrics and forward-fill
    /// them onto the bucket grid, clipped to the range.
    pub fn fetch_and_store(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OnChainRow>, DataError> {
        let (fresh, cached) = self.cache.check::<OnChainRow>(DataKind::OnChain);
        if fresh {
            info!(records = cached.len(), "using local on-chain data");
            return Ok(cached);
        }

        let asset = self.asset();
        let points = self
            .source
            .fetch_chain_metrics(&asset, start.date(), end.date())?;
        if points.is_empty() {
            warn!(asset = %asset, "no on-chain data returned");
            return Ok(Vec::new());
        }

        let mut samples: Vec<(NaiveDateTime, (f64, f64))> = points
            .iter()
            .map(|p| (p.timestamp, (p.tx_count, p.active_addresses)))
            .collect();
        samples.sort_by_key(|(ts, _)| *ts);

        let grid = bucket_range(start, end, self.cache.interval().duration());
        let rows: Vec<OnChainRow> = forward_fill(&samples, &grid)
            .into_iter()
            .map(|(timestamp, (tx_volume, active_addresses))| OnChainRow {
                timestamp,
                tx_volume,
                active_addresses,
            })
            .collect();

        if rows.is_empty() {
            warn!(asset = %asset, "on-chain series does not overlap the requested range");
            return Ok(rows);
        }
        self.cache.save(DataKind::OnChain, &rows)?;
        Ok(rows)
    }
}
