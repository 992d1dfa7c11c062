//! Live price refresh from multiple public sources.
//!
//! Feeds run concurrently with a per-source timeout; a slow or failing
//! source yields partial results and never aborts the refresh. The merged
//! map feeds the metric engine with current prices each cycle.

mod binance;
mod coingecko;

pub use binance::BinanceFeed;
pub use coingecko::CoinGeckoFeed;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::PriceConfig;

/// A source of current asset prices.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch current prices for the given assets in the quote currency.
    /// Unknown assets are skipped, not errors.
    async fn fetch(&self, assets: &[String], currency: &str) -> Result<HashMap<String, Decimal>>;
}

/// Fans price fetches out across all enabled feeds.
pub struct PriceService {
    feeds: Vec<Box<dyn PriceFeed>>,
    assets: Vec<String>,
    currency: String,
    timeout: Duration,
}

impl PriceService {
    pub fn from_config(config: &PriceConfig) -> Self {
        let mut feeds: Vec<Box<dyn PriceFeed>> = Vec::new();
        if config.coingecko_enabled {
            feeds.push(Box::new(CoinGeckoFeed::new()));
        }
        if config.binance_enabled {
            feeds.push(Box::new(BinanceFeed::new()));
        }
        if feeds.is_empty() {
            warn!("No price feeds enabled; positions keep their stored prices");
        }

        Self {
            feeds,
            assets: config.assets.clone(),
            currency: config.currency.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// Construct from explicit feeds (tests and embedders).
    pub fn new(
        feeds: Vec<Box<dyn PriceFeed>>,
        assets: Vec<String>,
        currency: String,
        timeout: Duration,
    ) -> Self {
        Self {
            feeds,
            assets,
            currency,
            timeout,
        }
    }

    /// Refresh prices from every feed concurrently.
    ///
    /// Each feed gets its own timeout; failures and timeouts are logged
    /// and the remaining feeds' results are still merged. Feeds later in
    /// the list win on overlapping assets.
    pub async fn refresh(&self) -> HashMap<String, Decimal> {
        let fetches = self.feeds.iter().map(|feed| async {
            let result =
                tokio::time::timeout(self.timeout, feed.fetch(&self.assets, &self.currency)).await;
            (feed.name(), result)
        });

        let mut merged: HashMap<String, Decimal> = HashMap::new();
        for (name, outcome) in join_all(fetches).await {
            match outcome {
                Ok(Ok(prices)) => {
                    debug!(feed = name, assets = prices.len(), "Price feed updated");
                    merged.extend(prices);
                }
                Ok(Err(e)) => warn!(feed = name, error = %e, "Price feed failed"),
                Err(_) => warn!(feed = name, timeout = ?self.timeout, "Price feed timed out"),
            }
        }

        info!(
            assets = merged.len(),
            requested = self.assets.len(),
            "Price refresh complete"
        );
        merged
    }
}
