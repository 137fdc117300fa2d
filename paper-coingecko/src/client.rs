//! CoinGecko API client
//!
//! Provides methods for fetching spot prices and market charts from the
//! public CoinGecko API. The upstream is treated as unreliable; every call
//! carries a bounded timeout and all failures map to recoverable errors.

use crate::types::{coin_id, symbol_for_id, MarketChartResponse, SimplePriceEntry};
use chrono::{DateTime, Utc};
use paper_core::{ChartPoint, PricePoint};
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Base URL for the CoinGecko API
const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Request timeout; the feed must never hang on the upstream
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors from CoinGecko API operations
#[derive(Debug, thiserror::Error)]
pub enum CoinGeckoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("CoinGecko API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl From<CoinGeckoError> for paper_core::EngineError {
    fn from(err: CoinGeckoError) -> Self {
        paper_core::EngineError::upstream(err.to_string())
    }
}

/// CoinGecko API client
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    /// Create a new client against the public API
    ///
    /// Picks up `COINGECKO_API_KEY` from the environment if set.
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_API_BASE)
    }

    /// Create a client against a specific base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        let api_key = std::env::var("COINGECKO_API_KEY").ok();
        if api_key.is_some() {
            tracing::info!("Loaded CoinGecko API key from environment");
        }

        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }
        req
    }

    /// Fetch current prices for a set of symbols
    ///
    /// Returns a map keyed by symbol. Symbols without a known CoinGecko id
    /// are skipped with a warning rather than failing the whole batch.
    #[instrument(skip(self))]
    pub async fn fetch_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PricePoint>, CoinGeckoError> {
        let mut ids = Vec::new();
        for symbol in symbols {
            match coin_id(symbol) {
                Some(id) => ids.push(id),
                None => warn!("No CoinGecko id for symbol {}, skipping", symbol),
            }
        }
        if ids.is_empty() {
            return Err(CoinGeckoError::UnknownSymbol(symbols.join(",")));
        }

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_market_cap=true&include_24hr_vol=true&include_24hr_change=true",
            self.base_url,
            ids.join(",")
        );

        debug!("Fetching CoinGecko prices from: {}", url);

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| CoinGeckoError::Network(format!("Failed to fetch prices: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoinGeckoError::Api(format!(
                "price request failed ({}): {}",
                status, body
            )));
        }

        let entries: HashMap<String, SimplePriceEntry> = response
            .json()
            .await
            .map_err(|e| CoinGeckoError::Parse(format!("Failed to parse price response: {}", e)))?;

        let now = Utc::now();
        let mut prices = HashMap::new();
        for (id, entry) in entries {
            let Some(symbol) = symbol_for_id(&id) else {
                continue;
            };
            let Some(price) = entry.usd else {
                warn!("CoinGecko returned no USD price for {}", id);
                continue;
            };

            prices.insert(
                symbol.to_string(),
                PricePoint {
                    symbol: symbol.to_string(),
                    pair: format!("{}/USDT", symbol),
                    price,
                    change_24h: entry.usd_24h_change.unwrap_or(Decimal::ZERO),
                    volume_24h: entry.usd_24h_vol,
                    market_cap: entry.usd_market_cap,
                    updated_at: now,
                },
            );
        }

        Ok(prices)
    }

    /// Fetch the raw market chart for a symbol over the last `days` days
    ///
    /// Points come back at CoinGecko's own granularity (hourly below 90
    /// days); bucketing into candles is the history service's job.
    #[instrument(skip(self))]
    pub async fn fetch_market_chart(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<ChartPoint>, CoinGeckoError> {
        let id = coin_id(symbol)
            .ok_or_else(|| CoinGeckoError::UnknownSymbol(symbol.to_string()))?;

        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            self.base_url, id, days
        );

        debug!("Fetching CoinGecko market chart from: {}", url);

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| CoinGeckoError::Network(format!("Failed to fetch market chart: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoinGeckoError::Api(format!(
                "market chart request failed ({}): {}",
                status, body
            )));
        }

        let chart: MarketChartResponse = response.json().await.map_err(|e| {
            CoinGeckoError::Parse(format!("Failed to parse market chart response: {}", e))
        })?;

        let points = chart
            .prices
            .iter()
            .enumerate()
            .filter_map(|(i, (ts_ms, price))| {
                let timestamp = DateTime::from_timestamp((*ts_ms as i64) / 1000, 0)?;
                let volume = chart
                    .total_volumes
                    .get(i)
                    .map(|(_, v)| *v)
                    .unwrap_or(Decimal::ZERO);
                Some(ChartPoint {
                    timestamp,
                    price: *price,
                    volume,
                })
            })
            .collect();

        Ok(points)
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}
