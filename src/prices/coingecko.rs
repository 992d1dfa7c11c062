//! CoinGecko simple-price feed.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::warn;

use super::PriceFeed;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com";

/// Symbol -> CoinGecko slug. Assets outside this map are skipped.
fn slug_for(symbol: &str) -> Option<&'static str> {
    match symbol.to_ascii_uppercase().as_str() {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "LTC" => Some("litecoin"),
        "DOGE" => Some("dogecoin"),
        "ADA" => Some("cardano"),
        "XRP" => Some("ripple"),
        _ => None,
    }
}

pub struct CoinGeckoFeed {
    http: Client,
    base_url: String,
}

impl CoinGeckoFeed {
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for CoinGeckoFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch(&self, assets: &[String], currency: &str) -> Result<HashMap<String, Decimal>> {
        let mut slugs: Vec<(&str, &String)> = Vec::new();
        for asset in assets {
            match slug_for(asset) {
                Some(slug) => slugs.push((slug, asset)),
                None => warn!(asset = %asset, "No CoinGecko slug known, skipping"),
            }
        }
        if slugs.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = slugs
            .iter()
            .map(|(slug, _)| *slug)
            .collect::<Vec<_>>()
            .join(",");

        let url = format!("{}/api/v3/simple/price", self.base_url);
        let response: HashMap<String, HashMap<String, Decimal>> = self
            .http
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", currency)])
            .send()
            .await
            .context("Failed to fetch CoinGecko prices")?
            .error_for_status()
            .context("CoinGecko returned an error status")?
            .json()
            .await
            .context("Failed to parse CoinGecko price response")?;

        let mut prices = HashMap::new();
        for (slug, asset) in slugs {
            if let Some(price) = response.get(slug).and_then(|quotes| quotes.get(currency)) {
                prices.insert(asset.clone(), *price);
            }
        }
        Ok(prices)
    }
}
