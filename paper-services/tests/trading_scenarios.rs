//! End-to-end trading scenarios against the full service graph
//!
//! Run with: cargo test -p paper-services --test trading_scenarios

use async_trait::async_trait;
use chrono::Utc;
use paper_core::{
    ChartPoint, EngineError, EngineResult, PricePoint, SnapshotSource, TradeSide,
};
use paper_services::{
    AccountRepository, AlertService, ExecutionEngine, HistoryService, MarketDataSource,
    NotificationHub, PortfolioService, PriceFeed, SqliteAccountStore,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

/// Upstream fake with settable prices
struct FixedSource {
    prices: HashMap<String, PricePoint>,
}

impl FixedSource {
    fn new(prices: &[(&str, Decimal)]) -> Self {
        let now = Utc::now();
        Self {
            prices: prices
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
                .collect(),
        }
    }
}

#[async_trait]
impl MarketDataSource for FixedSource {
    async fn latest_prices(
        &self,
        _symbols: &[String],
    ) -> EngineResult<HashMap<String, PricePoint>> {
        Ok(self.prices.clone())
    }

    async fn price_history(&self, _symbol: &str, _days: u32) -> EngineResult<Vec<ChartPoint>> {
        Err(EngineError::upstream("history unavailable"))
    }
}

struct Platform {
    feed: Arc<PriceFeed>,
    engine: Arc<ExecutionEngine>,
    portfolio: PortfolioService,
    history: HistoryService,
}

async fn platform_at(prices: &[(&str, Decimal)]) -> Platform {
    let store: Arc<dyn AccountRepository> =
        Arc::new(SqliteAccountStore::new_in_memory().unwrap());
    let hub = Arc::new(NotificationHub::new());
    let source: Arc<dyn MarketDataSource> = Arc::new(FixedSource::new(prices));

    let feed = Arc::new(PriceFeed::new(
        Arc::clone(&source),
        Arc::clone(&hub),
        prices.iter().map(|(s, _)| s.to_string()).collect(),
    ));
    feed.refresh().await.unwrap();

    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&store),
        Arc::clone(&feed),
        Arc::clone(&hub),
    ));
    let alerts = Arc::new(AlertService::new(Arc::clone(&store), Arc::clone(&hub)));
    feed.set_alert_service(alerts);
    feed.set_execution_engine(Arc::clone(&engine));

    Platform {
        feed: Arc::clone(&feed),
        engine,
        portfolio: PortfolioService::new(Arc::clone(&store), Arc::clone(&feed)),
        history: HistoryService::new(source, feed),
    }
}

#[tokio::test]
async fn buy_then_sell_round_trip() {
    let platform = platform_at(&[("BTC", dec!(60000))]).await;
    platform.engine.open_account("trader").unwrap();

    let buy = platform
        .engine
        .execute("trader", TradeSide::Buy, "BTC", dec!(3000), None)
        .await
        .unwrap();
    assert_eq!(buy.quantity, dec!(0.05));

    let account = platform.engine.account("trader").unwrap();
    assert_eq!(account.balance, dec!(7000));
    assert_eq!(account.holding("BTC"), dec!(0.05));

    let sell = platform
        .engine
        .execute(
            "trader",
            TradeSide::Sell,
            "BTC",
            dec!(0.05) * dec!(62000),
            Some(dec!(62000)),
        )
        .await
        .unwrap();
    assert_eq!(sell.quantity, dec!(0.05));

    let account = platform.engine.account("trader").unwrap();
    assert_eq!(account.balance, dec!(10100));
    assert_eq!(account.holding("BTC"), Decimal::ZERO);

    // The ledger drives performance, which sees the +100 round trip
    let report = platform.portfolio.performance("trader").unwrap();
    assert_eq!(report.trade_count, 2);
    assert_eq!(report.final_equity, dec!(10100));
    assert_eq!(report.total_return_pct, dec!(1));
}

#[tokio::test]
async fn repeated_operations_have_no_drift() {
    let platform = platform_at(&[("ETH", dec!(2500))]).await;
    platform.engine.open_account("trader").unwrap();

    // 40 round trips of the same size leave the account exactly where it
    // started; Decimal arithmetic accumulates no error
    for _ in 0..40 {
        platform
            .engine
            .execute("trader", TradeSide::Buy, "ETH", dec!(250), None)
            .await
            .unwrap();
        platform
            .engine
            .execute("trader", TradeSide::Sell, "ETH", dec!(250), None)
            .await
            .unwrap();
    }

    let account = platform.engine.account("trader").unwrap();
    assert_eq!(account.balance, dec!(10000));
    assert_eq!(account.holding("ETH"), Decimal::ZERO);
    assert_eq!(platform.engine.trades("trader").unwrap().len(), 80);
}

#[tokio::test]
async fn valuation_tracks_feed_prices() {
    let platform = platform_at(&[("BTC", dec!(50000)), ("ETH", dec!(2000))]).await;
    platform.engine.open_account("trader").unwrap();

    platform
        .engine
        .execute("trader", TradeSide::Buy, "BTC", dec!(5000), None)
        .await
        .unwrap();
    platform
        .engine
        .execute("trader", TradeSide::Buy, "ETH", dec!(2000), None)
        .await
        .unwrap();

    let valuation = platform.portfolio.value("trader").unwrap();
    assert_eq!(valuation.cash_balance, dec!(3000));
    assert_eq!(valuation.total_value, dec!(10000));

    let allocations: Decimal = valuation
        .holdings
        .iter()
        .map(|h| h.allocation_pct)
        .sum::<Decimal>();
    // Cash takes the remaining 30%
    assert_eq!(allocations, dec!(70));
}

#[tokio::test]
async fn feed_fallback_and_synthetic_history() {
    // Upstream history always fails in these fixtures; the history service
    // must still produce a structurally valid, clearly-tagged series
    let platform = platform_at(&[("BTC", dec!(60000))]).await;

    let series = platform.history.series("BTC", 14).await.unwrap();
    assert!(series.synthetic);
    assert_eq!(series.candles.len(), 14);
    for candle in &series.candles {
        assert!(candle.high >= candle.open.max(candle.close));
        assert!(candle.low <= candle.open.min(candle.close));
        assert!(candle.volume > Decimal::ZERO);
    }

    assert_eq!(platform.feed.current().source, SnapshotSource::Live);
}

#[tokio::test]
async fn refresh_tick_settles_limit_orders_and_alerts() {
    let platform = platform_at(&[("BTC", dec!(60000))]).await;
    platform.engine.open_account("trader").unwrap();

    // A buy limit below the market and an alert above it
    let order = platform
        .engine
        .place_limit("trader", TradeSide::Buy, "BTC", dec!(1000), dec!(61000))
        .await
        .unwrap();

    // The limit is above the current market, so the next refresh fills it
    let snapshot = platform.feed.refresh().await.unwrap();
    assert_eq!(snapshot.price_of("BTC"), Some(dec!(60000)));

    let orders = platform.engine.orders("trader").unwrap();
    assert_eq!(orders[0].id, order.id);
    assert_eq!(orders[0].status, paper_core::OrderStatus::Filled);

    let account = platform.engine.account("trader").unwrap();
    assert_eq!(account.balance, dec!(9000));
    assert_eq!(account.holding("BTC"), dec!(1000) / dec!(60000));
}
