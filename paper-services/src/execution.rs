//! Order Execution Engine
//!
//! Validates and applies simulated buys and sells against an account's
//! balance and holdings. This is a balance-sheet simulation, not a matching
//! engine: fills are whole, immediate, and priced from the feed (or a
//! caller-supplied limit price). There is no counter-party, no order book,
//! and no partial fill; that is a design limitation of the minimal engine,
//! not an oversight.
//!
//! Concurrency: every mutation runs under a per-account async mutex, and
//! the store's versioned save catches any writer that slipped past it.
//! Validation failures return before any state changes.

use crate::notifications::NotificationHub;
use crate::price_feed::PriceFeed;
use crate::store::{AccountRepository, StoreError};
use chrono::Utc;
use dashmap::DashMap;
use paper_core::{
    Account, EngineError, EngineResult, Order, OrderStatus, PriceSnapshot, ServerMessage,
    SubscriptionKey, Trade, TradeSide, TradeStatus,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Bounded retries when a save hits a version conflict
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// Every account opens with this balance
pub fn starting_balance() -> Decimal {
    Decimal::from(10_000)
}

/// Shortfall below which an over-sell clamps to zero instead of rejecting
///
/// Absorbs quantity rounding from amount/price division; anything larger is
/// a genuine insufficient-holdings case.
fn dust_tolerance() -> Decimal {
    Decimal::new(1, 9)
}

/// Simulated order execution engine
pub struct ExecutionEngine {
    store: Arc<dyn AccountRepository>,
    feed: Arc<PriceFeed>,
    hub: Arc<NotificationHub>,
    /// Per-account locks serializing all mutations
    account_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ExecutionEngine {
    /// Create a new engine
    pub fn new(
        store: Arc<dyn AccountRepository>,
        feed: Arc<PriceFeed>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self {
            store,
            feed,
            hub,
            account_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Open a new account with the starting balance
    pub fn open_account(&self, id: &str) -> EngineResult<Account> {
        if id.trim().is_empty() {
            return Err(EngineError::invalid_parameter("account id must not be empty"));
        }
        if self.store.get_account(id)?.is_some() {
            return Err(EngineError::conflict(id));
        }

        let account = Account::new(id, starting_balance());
        self.store.insert_account(&account)?;
        info!("Opened account {} with balance {}", id, account.balance);
        Ok(account)
    }

    /// Load an account
    pub fn account(&self, id: &str) -> EngineResult<Account> {
        self.store
            .get_account(id)?
            .ok_or_else(|| EngineError::account_not_found(id))
    }

    /// Trade ledger for an account, oldest first
    pub fn trades(&self, account_id: &str) -> EngineResult<Vec<Trade>> {
        Ok(self.store.trades_for(account_id)?)
    }

    /// Orders for an account, newest first
    pub fn orders(&self, account_id: &str) -> EngineResult<Vec<Order>> {
        Ok(self.store.orders_for(account_id)?)
    }

    /// Soft-deactivate an account; it stops trading but is never deleted
    pub async fn deactivate(&self, account_id: &str) -> EngineResult<Account> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        self.mutate(account_id, |account| {
            account.is_active = false;
            Ok(())
        })
    }

    /// Administrative balance adjustment (credit or debit)
    ///
    /// A debit larger than the balance clamps at zero, mirroring the
    /// sell-side holdings clamp.
    pub async fn adjust_balance(&self, account_id: &str, delta: Decimal) -> EngineResult<Account> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        self.mutate(account_id, |account| {
            let adjusted = account.balance + delta;
            if adjusted.is_sign_negative() {
                warn!(
                    "Balance adjustment of {} for {} clamped at zero (balance was {})",
                    delta, account.id, account.balance
                );
                account.balance = Decimal::ZERO;
            } else {
                account.balance = adjusted;
            }
            Ok(())
        })
    }

    /// Execute a simulated market (or price-overridden) order
    ///
    /// Validation runs in a fixed order and the first failure wins, with no
    /// state mutation: amount, account existence and activity, price,
    /// then funds or holdings. The effect is atomic from the caller's view;
    /// the account lock covers the whole read-modify-write.
    pub async fn execute(
        &self,
        account_id: &str,
        side: TradeSide,
        symbol: &str,
        amount: Decimal,
        price_override: Option<Decimal>,
    ) -> EngineResult<Trade> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::invalid_amount(format!(
                "order amount must be positive, got {}",
                amount
            )));
        }

        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        let (account, price, quantity) = loop {
            attempt += 1;

            let mut account = self
                .store
                .get_account(account_id)?
                .ok_or_else(|| EngineError::account_not_found(account_id))?;
            if !account.is_active {
                return Err(EngineError::account_inactive(account_id));
            }

            let price = price_override
                .or_else(|| self.feed.price_of(symbol))
                .filter(|p| *p > Decimal::ZERO)
                .ok_or_else(|| EngineError::no_price(symbol))?;
            let quantity = amount / price;

            match side {
                TradeSide::Buy => {
                    if amount > account.balance {
                        return Err(EngineError::InsufficientBalance {
                            needed: amount,
                            available: account.balance,
                        });
                    }
                    account.balance -= amount;
                    account.set_holding(symbol, account.holding(symbol) + quantity);
                }
                TradeSide::Sell => {
                    let held = account.holding(symbol);
                    let shortfall = quantity - held;
                    if shortfall > dust_tolerance() {
                        return Err(EngineError::InsufficientHoldings {
                            symbol: symbol.to_string(),
                            needed: quantity,
                            available: held,
                        });
                    }
                    if shortfall > Decimal::ZERO {
                        warn!(
                            "Sell of {} {} clamped holdings to zero (held {}, shortfall {})",
                            quantity, symbol, held, shortfall
                        );
                    }
                    let remaining = (held - quantity).max(Decimal::ZERO);
                    account.balance += amount;
                    account.set_holding(symbol, remaining);
                }
            }

            match self.store.save_account(&account) {
                Ok(saved) => break (saved, price, quantity),
                Err(StoreError::Conflict(_)) if attempt < MAX_SAVE_ATTEMPTS => {
                    warn!(
                        "Save conflict for account {} (attempt {}), retrying",
                        account_id, attempt
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let trade = Trade {
            id: Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            side,
            symbol: symbol.to_string(),
            amount,
            price,
            quantity,
            status: TradeStatus::Completed,
            executed_at: Utc::now(),
        };
        self.store.append_trade(&trade)?;

        info!(
            "Executed {} {} {} for {} @ {} (qty {})",
            trade.side.as_str(),
            trade.amount,
            trade.symbol,
            trade.account_id,
            trade.price,
            trade.quantity
        );
        self.hub.publish(
            SubscriptionKey::trades(trade.account_id.clone()),
            ServerMessage::TradeExecuted {
                trade: trade.clone(),
            },
        );

        Ok(trade)
    }

    /// Place a resting limit order
    ///
    /// Funds and holdings are checked at fill time, not placement time, so
    /// a pending order reserves nothing.
    pub async fn place_limit(
        &self,
        account_id: &str,
        side: TradeSide,
        symbol: &str,
        amount: Decimal,
        limit_price: Decimal,
    ) -> EngineResult<Order> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::invalid_amount(format!(
                "order amount must be positive, got {}",
                amount
            )));
        }
        if limit_price <= Decimal::ZERO {
            return Err(EngineError::invalid_parameter(
                "limit price must be positive",
            ));
        }
        let account = self.account(account_id)?;
        if !account.is_active {
            return Err(EngineError::account_inactive(account_id));
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            account_id: account.id,
            side,
            symbol: symbol.to_string(),
            amount,
            limit_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            filled_at: None,
            trade_id: None,
        };
        self.store.insert_order(&order)?;
        info!(
            "Placed limit order {}: {} {} {} @ {}",
            order.id,
            order.side.as_str(),
            order.amount,
            order.symbol,
            order.limit_price
        );
        Ok(order)
    }

    /// Cancel a pending order
    ///
    /// Cancelling a filled order fails with `AlreadyFilled`; cancelling an
    /// already-cancelled order is a no-op.
    pub fn cancel(&self, order_id: &str) -> EngineResult<Order> {
        let mut order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| EngineError::order_not_found(order_id))?;

        match order.status {
            OrderStatus::Filled => Err(EngineError::already_filled(order_id)),
            OrderStatus::Cancelled => Ok(order),
            OrderStatus::Pending => {
                order.status = OrderStatus::Cancelled;
                self.store.update_order(&order)?;
                info!("Cancelled order {}", order.id);
                Ok(order)
            }
        }
    }

    /// Settle pending orders against a fresh snapshot
    ///
    /// Triggered orders fill through the regular `execute` path at the
    /// snapshot price. A triggered order that fails validation (funds moved
    /// since placement, account deactivated) is cancelled with a log rather
    /// than left pending forever.
    pub async fn settle_pending(&self, snapshot: &PriceSnapshot) -> EngineResult<usize> {
        let pending = self.store.pending_orders()?;
        let mut filled = 0;

        for mut order in pending {
            let Some(price) = snapshot.price_of(&order.symbol) else {
                continue;
            };
            if !order.triggers_at(price) {
                continue;
            }

            match self
                .execute(
                    &order.account_id,
                    order.side,
                    &order.symbol,
                    order.amount,
                    Some(price),
                )
                .await
            {
                Ok(trade) => {
                    order.status = OrderStatus::Filled;
                    order.filled_at = Some(trade.executed_at);
                    order.trade_id = Some(trade.id);
                    self.store.update_order(&order)?;
                    info!("Limit order {} filled @ {}", order.id, price);
                    filled += 1;
                }
                Err(e) => {
                    warn!("Limit order {} rejected at fill time: {}", order.id, e);
                    order.status = OrderStatus::Cancelled;
                    self.store.update_order(&order)?;
                }
            }
        }

        Ok(filled)
    }

    /// Read-modify-write one account with bounded conflict retry
    ///
    /// `apply` must be pure over the account; it runs again on retry.
    /// The caller holds the per-account lock, so conflicts only come from
    /// writers outside this engine.
    fn mutate<F>(&self, account_id: &str, apply: F) -> EngineResult<Account>
    where
        F: Fn(&mut Account) -> EngineResult<()>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut account = self
                .store
                .get_account(account_id)?
                .ok_or_else(|| EngineError::account_not_found(account_id))?;
            apply(&mut account)?;

            match self.store.save_account(&account) {
                Ok(saved) => return Ok(saved),
                Err(StoreError::Conflict(_)) if attempt < MAX_SAVE_ATTEMPTS => {
                    warn!(
                        "Save conflict for account {} (attempt {}), retrying",
                        account_id, attempt
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
