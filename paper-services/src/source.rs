//! Upstream market data seam
//!
//! The price feed and history service reach the upstream provider through
//! this trait, so the provider stays swappable and tests run against fakes.
//! The upstream is unreliable by contract; every failure maps to
//! `EngineError::UpstreamUnavailable` and is recovered by a fallback.

use async_trait::async_trait;
use paper_coingecko::CoinGeckoClient;
use paper_core::{ChartPoint, EngineResult, PricePoint};
use std::collections::HashMap;

/// Source of live prices and historical charts
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch current prices for the given symbols, keyed by symbol
    async fn latest_prices(
        &self,
        symbols: &[String],
    ) -> EngineResult<HashMap<String, PricePoint>>;

    /// Fetch raw chart points for a symbol over the last `days` days
    async fn price_history(&self, symbol: &str, days: u32) -> EngineResult<Vec<ChartPoint>>;
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn latest_prices(
        &self,
        symbols: &[String],
    ) -> EngineResult<HashMap<String, PricePoint>> {
        Ok(self.fetch_prices(symbols).await?)
    }

    async fn price_history(&self, symbol: &str, days: u32) -> EngineResult<Vec<ChartPoint>> {
        Ok(self.fetch_market_chart(symbol, days).await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake sources shared by the service tests

    use super::*;
    use chrono::Utc;
    use paper_core::EngineError;
    use rust_decimal::Decimal;

    /// Source that always returns the same prices
    pub(crate) struct StaticSource {
        prices: HashMap<String, PricePoint>,
        chart: Vec<ChartPoint>,
    }

    impl StaticSource {
        pub(crate) fn new(prices: &[(&str, Decimal)]) -> Self {
            let now = Utc::now();
            let prices = prices
                .iter()
                .map(|(symbol, price)| {
                    (
                        symbol.to_string(),
                        PricePoint {
                            symbol: symbol.to_string(),
                            pair: format!("{}/USDT", symbol),
                            price: *price,
                            change_24h: Decimal::ZERO,
                            volume_24h: None,
                            market_cap: None,
                            updated_at: now,
                        },
                    )
                })
                .collect();
            Self {
                prices,
                chart: Vec::new(),
            }
        }

        pub(crate) fn with_chart(mut self, chart: Vec<ChartPoint>) -> Self {
            self.chart = chart;
            self
        }
    }

    #[async_trait]
    impl MarketDataSource for StaticSource {
        async fn latest_prices(
            &self,
            _symbols: &[String],
        ) -> EngineResult<HashMap<String, PricePoint>> {
            Ok(self.prices.clone())
        }

        async fn price_history(
            &self,
            _symbol: &str,
            _days: u32,
        ) -> EngineResult<Vec<ChartPoint>> {
            Ok(self.chart.clone())
        }
    }

    /// Source that fails every call
    pub(crate) struct FailingSource;

    #[async_trait]
    impl MarketDataSource for FailingSource {
        async fn latest_prices(
            &self,
            _symbols: &[String],
        ) -> EngineResult<HashMap<String, PricePoint>> {
            Err(EngineError::upstream("connection refused"))
        }

        async fn price_history(
            &self,
            _symbol: &str,
            _days: u32,
        ) -> EngineResult<Vec<ChartPoint>> {
            Err(EngineError::upstream("connection refused"))
        }
    }
}
