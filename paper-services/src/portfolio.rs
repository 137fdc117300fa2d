//! Portfolio valuation and performance
//!
//! Valuation prices the account's holdings against the current feed
//! snapshot. Performance statistics are replayed from the persisted trade
//! ledger and from nowhere else; when the ledger is too short to support a
//! statistic, the field is omitted rather than estimated.

use crate::execution::starting_balance;
use crate::price_feed::PriceFeed;
use crate::store::AccountRepository;
use chrono::{DateTime, Utc};
use paper_core::{EngineError, EngineResult, TradeSide};
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimum equity-curve points for volatility/drawdown/Sharpe
const MIN_CURVE_POINTS: usize = 3;

/// Valuation of one held asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValuation {
    /// Asset symbol
    pub symbol: String,
    /// Quantity held
    pub quantity: Decimal,
    /// Price used for valuation
    pub price: Decimal,
    /// quantity × price
    pub value: Decimal,
    /// Share of total portfolio value, in percent
    pub allocation_pct: Decimal,
    /// False when the snapshot had no price and the holding valued at zero
    pub priced: bool,
}

/// Point-in-time valuation of a whole account
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    /// Account being valued
    pub account_id: String,
    /// Cash plus the value of all holdings
    pub total_value: Decimal,
    /// Cash component
    pub cash_balance: Decimal,
    /// Per-asset breakdown, largest value first
    pub holdings: Vec<HoldingValuation>,
    /// When the price snapshot was taken
    pub priced_at: DateTime<Utc>,
}

/// Where performance figures were computed from
///
/// Only the trade ledger exists today; the tag is serialized so a consumer
/// can never mistake derived statistics for synthetic ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsBasis {
    TradeLedger,
}

/// Performance statistics replayed from the trade ledger
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// Account the report covers
    pub account_id: String,
    /// Source of every figure in this report
    pub basis: MetricsBasis,
    /// Number of recorded trades
    pub trade_count: usize,
    /// Sum of buy notionals
    pub total_invested: Decimal,
    /// Sum of sell notionals
    pub total_proceeds: Decimal,
    /// Final replayed equity (cash + holdings at last seen prices)
    pub final_equity: Decimal,
    /// Total return versus the starting balance, in percent
    pub total_return_pct: Decimal,
    /// Population stddev of per-trade equity returns; needs ≥ 3 points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<Decimal>,
    /// Largest peak-to-trough equity decline, in percent; needs ≥ 3 points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drawdown_pct: Option<Decimal>,
    /// Mean return over volatility; needs ≥ 3 points and non-zero volatility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<Decimal>,
}

/// Portfolio valuation service
pub struct PortfolioService {
    store: Arc<dyn AccountRepository>,
    feed: Arc<PriceFeed>,
}

impl PortfolioService {
    /// Create a new valuator
    pub fn new(store: Arc<dyn AccountRepository>, feed: Arc<PriceFeed>) -> Self {
        Self { store, feed }
    }

    /// Value an account against the current snapshot
    ///
    /// A holding whose symbol is missing from the snapshot values at zero
    /// and is flagged unpriced; the valuation itself never fails on a
    /// price miss.
    pub fn value(&self, account_id: &str) -> EngineResult<PortfolioValuation> {
        let account = self
            .store
            .get_account(account_id)?
            .ok_or_else(|| EngineError::account_not_found(account_id))?;
        let snapshot = self.feed.current();

        let mut holdings: Vec<HoldingValuation> = account
            .holdings
            .iter()
            .map(|(symbol, quantity)| {
                let price = snapshot.price_of(symbol);
                let priced = price.is_some();
                let price = price.unwrap_or(Decimal::ZERO);
                HoldingValuation {
                    symbol: symbol.clone(),
                    quantity: *quantity,
                    price,
                    value: *quantity * price,
                    allocation_pct: Decimal::ZERO,
                    priced,
                }
            })
            .collect();

        let total_value =
            account.balance + holdings.iter().map(|h| h.value).sum::<Decimal>();

        // Second pass once the total is known; zero total means zero
        // allocations across the board.
        if !total_value.is_zero() {
            for holding in &mut holdings {
                holding.allocation_pct =
                    holding.value / total_value * Decimal::ONE_HUNDRED;
            }
        }
        holdings.sort_by(|a, b| b.value.cmp(&a.value));

        Ok(PortfolioValuation {
            account_id: account.id,
            total_value,
            cash_balance: account.balance,
            holdings,
            priced_at: snapshot.refreshed_at,
        })
    }

    /// Performance statistics replayed from the trade ledger
    ///
    /// The replay starts from the standard opening balance and applies each
    /// recorded fill in order, marking holdings to the fill prices seen so
    /// far. Statistics needing more history than the ledger provides come
    /// back as `None`, never as fabricated figures.
    pub fn performance(&self, account_id: &str) -> EngineResult<PerformanceReport> {
        self.store
            .get_account(account_id)?
            .ok_or_else(|| EngineError::account_not_found(account_id))?;
        let trades = self.store.trades_for(account_id)?;

        let opening = starting_balance();
        let mut cash = opening;
        let mut holdings: HashMap<String, Decimal> = HashMap::new();
        let mut last_price: HashMap<String, Decimal> = HashMap::new();
        let mut total_invested = Decimal::ZERO;
        let mut total_proceeds = Decimal::ZERO;

        // Equity after each fill, starting from the opening balance
        let mut curve = vec![opening];
        for trade in &trades {
            match trade.side {
                TradeSide::Buy => {
                    cash -= trade.amount;
                    *holdings.entry(trade.symbol.clone()).or_default() += trade.quantity;
                    total_invested += trade.amount;
                }
                TradeSide::Sell => {
                    cash += trade.amount;
                    let held = holdings.entry(trade.symbol.clone()).or_default();
                    *held = (*held - trade.quantity).max(Decimal::ZERO);
                    total_proceeds += trade.amount;
                }
            }
            last_price.insert(trade.symbol.clone(), trade.price);

            let marked = holdings
                .iter()
                .map(|(symbol, qty)| {
                    *qty * last_price.get(symbol).copied().unwrap_or(Decimal::ZERO)
                })
                .sum::<Decimal>();
            curve.push(cash + marked);
        }

        let final_equity = *curve.last().unwrap_or(&opening);
        let total_return_pct = if opening.is_zero() {
            Decimal::ZERO
        } else {
            (final_equity - opening) / opening * Decimal::ONE_HUNDRED
        };

        let (volatility, max_drawdown_pct, sharpe_ratio) = if curve.len() >= MIN_CURVE_POINTS
        {
            let returns: Vec<Decimal> = curve
                .windows(2)
                .filter(|w| !w[0].is_zero())
                .map(|w| (w[1] - w[0]) / w[0])
                .collect();
            let vol = population_stddev(&returns);
            let drawdown = max_drawdown(&curve);
            let sharpe = match (mean(&returns), vol) {
                (Some(m), Some(v)) if !v.is_zero() => Some(m / v),
                _ => None,
            };
            (vol, drawdown, sharpe)
        } else {
            (None, None, None)
        };

        Ok(PerformanceReport {
            account_id: account_id.to_string(),
            basis: MetricsBasis::TradeLedger,
            trade_count: trades.len(),
            total_invested,
            total_proceeds,
            final_equity,
            total_return_pct,
            volatility,
            max_drawdown_pct,
            sharpe_ratio,
        })
    }
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().copied().sum::<Decimal>() / Decimal::from(values.len() as u64))
}

fn population_stddev(values: &[Decimal]) -> Option<Decimal> {
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let d = *v - mean;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(values.len() as u64);
    variance.sqrt()
}

/// Largest peak-to-trough decline over the curve, as a positive percentage
fn max_drawdown(curve: &[Decimal]) -> Option<Decimal> {
    let mut peak = *curve.first()?;
    let mut worst = Decimal::ZERO;
    for value in curve {
        if *value > peak {
            peak = *value;
        } else if !peak.is_zero() {
            let drawdown = (peak - *value) / peak * Decimal::ONE_HUNDRED;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    Some(worst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionEngine;
    use crate::notifications::NotificationHub;
    use crate::source::testing::StaticSource;
    use crate::store::SqliteAccountStore;
    use paper_core::TradeSide;
    use rust_decimal_macros::dec;

    async fn setup(
        prices: &[(&str, Decimal)],
    ) -> (Arc<SqliteAccountStore>, Arc<PriceFeed>, ExecutionEngine) {
        let store = Arc::new(SqliteAccountStore::new_in_memory().unwrap());
        let hub = Arc::new(NotificationHub::new());
        let feed = Arc::new(PriceFeed::new(
            Arc::new(StaticSource::new(prices)),
            Arc::clone(&hub),
            prices.iter().map(|(s, _)| s.to_string()).collect(),
        ));
        feed.refresh().await.unwrap();
        let engine = ExecutionEngine::new(
            store.clone() as Arc<dyn AccountRepository>,
            Arc::clone(&feed),
            hub,
        );
        (store, feed, engine)
    }

    #[tokio::test]
    async fn test_valuation_totals_and_allocation() {
        let (store, feed, engine) = setup(&[("BTC", dec!(60000)), ("ETH", dec!(3000))]).await;
        engine.open_account("acct-1").unwrap();
        engine
            .execute("acct-1", TradeSide::Buy, "BTC", dec!(3000), None)
            .await
            .unwrap();
        engine
            .execute("acct-1", TradeSide::Buy, "ETH", dec!(1500), None)
            .await
            .unwrap();

        let portfolio = PortfolioService::new(store, feed);
        let valuation = portfolio.value("acct-1").unwrap();

        assert_eq!(valuation.cash_balance, dec!(5500));
        // Holdings mark back to their purchase prices with a static feed
        assert_eq!(valuation.total_value, dec!(10000));
        assert_eq!(valuation.holdings.len(), 2);
        assert_eq!(valuation.holdings[0].symbol, "BTC");
        assert_eq!(valuation.holdings[0].value, dec!(3000));
        assert_eq!(valuation.holdings[0].allocation_pct, dec!(30));
        assert!(valuation.holdings.iter().all(|h| h.priced));
    }

    #[tokio::test]
    async fn test_unpriced_holding_values_at_zero() {
        let (store, feed, engine) = setup(&[("BTC", dec!(60000))]).await;
        engine.open_account("acct-1").unwrap();

        // A holding the snapshot knows nothing about
        let mut account = engine.account("acct-1").unwrap();
        account.set_holding("DOGE", dec!(1000));
        store.save_account(&account).unwrap();

        let portfolio = PortfolioService::new(store, feed);
        let valuation = portfolio.value("acct-1").unwrap();

        let doge = valuation
            .holdings
            .iter()
            .find(|h| h.symbol == "DOGE")
            .unwrap();
        assert!(!doge.priced);
        assert_eq!(doge.value, Decimal::ZERO);
        assert_eq!(valuation.total_value, dec!(10000));
    }

    #[tokio::test]
    async fn test_zero_total_value_has_zero_allocations() {
        let (store, feed, engine) = setup(&[("BTC", dec!(60000))]).await;
        engine.open_account("acct-1").unwrap();
        engine.adjust_balance("acct-1", dec!(-10000)).await.unwrap();

        let portfolio = PortfolioService::new(store, feed);
        let valuation = portfolio.value("acct-1").unwrap();
        assert_eq!(valuation.total_value, Decimal::ZERO);
        assert!(valuation.holdings.is_empty());
    }

    #[tokio::test]
    async fn test_performance_empty_ledger_omits_statistics() {
        let (store, feed, engine) = setup(&[("BTC", dec!(60000))]).await;
        engine.open_account("acct-1").unwrap();

        let portfolio = PortfolioService::new(store, feed);
        let report = portfolio.performance("acct-1").unwrap();

        assert_eq!(report.basis, MetricsBasis::TradeLedger);
        assert_eq!(report.trade_count, 0);
        assert_eq!(report.total_return_pct, Decimal::ZERO);
        assert!(report.volatility.is_none());
        assert!(report.max_drawdown_pct.is_none());
        assert!(report.sharpe_ratio.is_none());
    }

    #[tokio::test]
    async fn test_performance_replays_ledger() {
        let (store, feed, engine) = setup(&[("BTC", dec!(60000))]).await;
        engine.open_account("acct-1").unwrap();

        engine
            .execute("acct-1", TradeSide::Buy, "BTC", dec!(3000), None)
            .await
            .unwrap();
        engine
            .execute("acct-1", TradeSide::Sell, "BTC", dec!(3100), Some(dec!(62000)))
            .await
            .unwrap();

        let portfolio = PortfolioService::new(store, feed);
        let report = portfolio.performance("acct-1").unwrap();

        assert_eq!(report.trade_count, 2);
        assert_eq!(report.total_invested, dec!(3000));
        assert_eq!(report.total_proceeds, dec!(3100));
        // 10000 -> buy (equity flat at fill price) -> sell at 62000: +100
        assert_eq!(report.final_equity, dec!(10100));
        assert_eq!(report.total_return_pct, dec!(1));
        // Three curve points: statistics are computable
        assert!(report.volatility.is_some());
        assert!(report.max_drawdown_pct.is_some());
    }

    #[tokio::test]
    async fn test_performance_missing_account() {
        let (store, feed, _engine) = setup(&[("BTC", dec!(60000))]).await;
        let portfolio = PortfolioService::new(store, feed);
        assert!(matches!(
            portfolio.performance("ghost"),
            Err(EngineError::AccountNotFound(_))
        ));
        assert!(matches!(
            portfolio.value("ghost"),
            Err(EngineError::AccountNotFound(_))
        ));
    }
}
