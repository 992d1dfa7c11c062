//! Binance spot ticker feed.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::PriceFeed;

const BINANCE_BASE_URL: &str = "https://api.binance.com";

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

pub struct BinanceFeed {
    http: Client,
    base_url: String,
}

impl BinanceFeed {
    pub fn new() -> Self {
        Self::with_base_url(BINANCE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for BinanceFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    fn name(&self) -> &'static str {
        "binance"
    }

    /// Fetch the full spot ticker list once and pick out `{ASSET}USDT`
    /// pairs. Binance quotes against USDT regardless of the configured
    /// display currency.
    async fn fetch(&self, assets: &[String], _currency: &str) -> Result<HashMap<String, Decimal>> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let tickers: Vec<TickerPrice> = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch Binance tickers")?
            .error_for_status()
            .context("Binance returned an error status")?
            .json()
            .await
            .context("Failed to parse Binance ticker response")?;

        let wanted: HashMap<String, &String> = assets
            .iter()
            .map(|asset| (format!("{}USDT", asset.to_ascii_uppercase()), asset))
            .collect();

        let mut prices = HashMap::new();
        for ticker in tickers {
            if let Some(asset) = wanted.get(&ticker.symbol) {
                prices.insert((*asset).clone(), ticker.price);
            }
        }
        Ok(prices)
    }
}
