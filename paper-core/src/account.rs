//! Account, trade, and order structures for the paper trading engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Side of a trade or order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Spending quote currency to acquire the asset
    Buy,
    /// Liquidating the asset back into quote currency
    Sell,
}

impl TradeSide {
    /// String form used in storage and API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// Status of a trade record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// Trade applied to the account; immutable from here on
    Completed,
    /// Reserved for future settlement flows
    Pending,
    /// Reserved for future settlement flows
    Cancelled,
}

/// A simulated trading account
///
/// Balance and holdings only change through the execution engine and the
/// administrative balance adjustment. Accounts are never hard-deleted;
/// `is_active` gates trading instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier
    pub id: String,

    /// Available cash balance in quote currency (never negative)
    pub balance: Decimal,

    /// Asset holdings keyed by symbol; quantities are never negative
    /// and zero entries are dropped
    pub holdings: HashMap<String, Decimal>,

    /// Inactive accounts are rejected by the execution engine
    pub is_active: bool,

    /// When the account was opened
    pub created_at: DateTime<Utc>,

    /// Optimistic concurrency version, incremented on every save
    #[serde(default)]
    pub version: u64,
}

impl Account {
    /// Create a new active account with the given starting balance
    pub fn new(id: impl Into<String>, starting_balance: Decimal) -> Self {
        Self {
            id: id.into(),
            balance: starting_balance,
            holdings: HashMap::new(),
            is_active: true,
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// Quantity held of a symbol (zero when absent)
    pub fn holding(&self, symbol: &str) -> Decimal {
        self.holdings
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Set a holding, dropping the entry when the quantity reaches zero
    pub fn set_holding(&mut self, symbol: &str, quantity: Decimal) {
        if quantity.is_zero() {
            self.holdings.remove(symbol);
        } else {
            self.holdings.insert(symbol.to_string(), quantity);
        }
    }
}

/// An executed trade against an account
///
/// Completed trades form an append-only ledger and are immutable once
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    pub id: String,

    /// Account this trade belongs to
    pub account_id: String,

    /// Buy or sell
    pub side: TradeSide,

    /// Asset symbol (e.g. "BTC")
    pub symbol: String,

    /// Notional amount in quote currency
    pub amount: Decimal,

    /// Price at which the trade filled
    pub price: Decimal,

    /// Base quantity (amount / price)
    pub quantity: Decimal,

    /// Status of the trade record
    pub status: TradeStatus,

    /// When the trade was executed
    pub executed_at: DateTime<Utc>,
}

/// Lifecycle of a resting limit order
///
/// Pending orders move to exactly one of Filled or Cancelled. Cancellation
/// after a fill is rejected with `AlreadyFilled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Waiting for a price feed tick to satisfy the limit
    Pending,
    /// Filled in full; partial fills are not modelled
    Filled,
    /// Cancelled while still pending
    Cancelled,
}

/// A resting limit order, settled against price feed ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier
    pub id: String,

    /// Account that placed the order
    pub account_id: String,

    /// Buy or sell
    pub side: TradeSide,

    /// Asset symbol
    pub symbol: String,

    /// Notional amount in quote currency
    pub amount: Decimal,

    /// Price at which the order triggers
    pub limit_price: Decimal,

    /// Current lifecycle state
    pub status: OrderStatus,

    /// When the order was placed
    pub created_at: DateTime<Utc>,

    /// When the order filled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_at: Option<DateTime<Utc>>,

    /// Trade produced by the fill
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
}

impl Order {
    /// Whether a tick at `market_price` triggers this order
    ///
    /// Buys trigger when the market trades at or below the limit, sells
    /// when it trades at or above.
    pub fn triggers_at(&self, market_price: Decimal) -> bool {
        match self.side {
            TradeSide::Buy => market_price <= self.limit_price,
            TradeSide::Sell => market_price >= self.limit_price,
        }
    }

    /// Whether the order can still be cancelled
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}
