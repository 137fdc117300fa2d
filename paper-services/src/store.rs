//! Account Store
//!
//! SQLite-backed persistence for accounts, trades, orders, and alerts.
//! The engine only sees the `AccountRepository` trait; the concrete store
//! is an implementation detail.

use chrono::{DateTime, Utc};
use paper_core::{
    Account, AlertDirection, AlertStatus, EngineError, Order, OrderStatus, PriceAlert, Trade,
    TradeSide, TradeStatus,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// Errors from account store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Version conflict for account {0}")]
    Conflict(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Failed to acquire lock")]
    LockError,
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => EngineError::Conflict(id),
            StoreError::NotFound(id) => EngineError::AccountNotFound(id),
            other => EngineError::Storage(other.to_string()),
        }
    }
}

/// Opaque persistence boundary for accounts and everything they own
pub trait AccountRepository: Send + Sync {
    /// Load an account by id
    fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a freshly opened account
    fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Persist an account, enforcing the optimistic version check
    ///
    /// Returns the account with its version bumped. Fails with
    /// `StoreError::Conflict` when the stored version has moved on.
    fn save_account(&self, account: &Account) -> Result<Account, StoreError>;

    /// Append a trade to the ledger
    fn append_trade(&self, trade: &Trade) -> Result<(), StoreError>;

    /// All trades for an account, oldest first
    fn trades_for(&self, account_id: &str) -> Result<Vec<Trade>, StoreError>;

    /// Insert a new resting order
    fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Load an order by id
    fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Persist an order's current state
    fn update_order(&self, order: &Order) -> Result<(), StoreError>;

    /// All orders still pending, oldest first
    fn pending_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// All orders for an account, newest first
    fn orders_for(&self, account_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Insert a new price alert
    fn insert_alert(&self, alert: &PriceAlert) -> Result<(), StoreError>;

    /// All alerts for an account, newest first
    fn alerts_for(&self, account_id: &str) -> Result<Vec<PriceAlert>, StoreError>;

    /// All alerts still active, across accounts
    fn active_alerts(&self) -> Result<Vec<PriceAlert>, StoreError>;

    /// Persist an alert's current state
    fn update_alert(&self, alert: &PriceAlert) -> Result<(), StoreError>;

    /// Delete an alert; returns whether a row was removed
    fn delete_alert(&self, id: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed account store
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
}

impl SqliteAccountStore {
    /// Create a new store backed by a database file
    ///
    /// Creates the file and tables if they don't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(StoreError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                balance TEXT NOT NULL,
                holdings JSON NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                side TEXT NOT NULL,
                symbol TEXT NOT NULL,
                amount TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity TEXT NOT NULL,
                status TEXT NOT NULL,
                executed_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trades_account
            ON trades(account_id, executed_at);

            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                side TEXT NOT NULL,
                symbol TEXT NOT NULL,
                amount TEXT NOT NULL,
                limit_price TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                filled_at INTEGER,
                trade_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_orders_status
            ON orders(status);

            CREATE INDEX IF NOT EXISTS idx_orders_account
            ON orders(account_id, created_at);

            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                target_price TEXT NOT NULL,
                direction TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                triggered_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_status
            ON alerts(status);

            CREATE INDEX IF NOT EXISTS idx_alerts_account
            ON alerts(account_id, created_at);
            "#,
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }
}

// Balances and quantities are stored as TEXT and parsed back into Decimal.
// REAL would round-trip through f64 and break the exact-arithmetic invariant.
fn decimal_column(value: String, idx: usize) -> rusqlite::Result<Decimal> {
    Decimal::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn timestamp_column(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    let holdings_json: String = row.get(2)?;
    let holdings: HashMap<String, Decimal> =
        serde_json::from_str(&holdings_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Account {
        id: row.get(0)?,
        balance: decimal_column(row.get(1)?, 1)?,
        holdings,
        is_active: row.get(3)?,
        created_at: timestamp_column(row.get(4)?),
        version: row.get::<_, i64>(5)? as u64,
    })
}

fn row_to_trade(row: &Row) -> rusqlite::Result<Trade> {
    let side: String = row.get(2)?;
    let status: String = row.get(7)?;

    Ok(Trade {
        id: row.get(0)?,
        account_id: row.get(1)?,
        side: if side == "buy" {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        },
        symbol: row.get(3)?,
        amount: decimal_column(row.get(4)?, 4)?,
        price: decimal_column(row.get(5)?, 5)?,
        quantity: decimal_column(row.get(6)?, 6)?,
        status: match status.as_str() {
            "pending" => TradeStatus::Pending,
            "cancelled" => TradeStatus::Cancelled,
            _ => TradeStatus::Completed,
        },
        executed_at: timestamp_column(row.get(8)?),
    })
}

fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let side: String = row.get(2)?;
    let status: String = row.get(6)?;
    let filled_at: Option<i64> = row.get(8)?;

    Ok(Order {
        id: row.get(0)?,
        account_id: row.get(1)?,
        side: if side == "buy" {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        },
        symbol: row.get(3)?,
        amount: decimal_column(row.get(4)?, 4)?,
        limit_price: decimal_column(row.get(5)?, 5)?,
        status: match status.as_str() {
            "filled" => OrderStatus::Filled,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        },
        created_at: timestamp_column(row.get(7)?),
        filled_at: filled_at.map(timestamp_column),
        trade_id: row.get(9)?,
    })
}

fn row_to_alert(row: &Row) -> rusqlite::Result<PriceAlert> {
    let direction: String = row.get(4)?;
    let status: String = row.get(5)?;
    let triggered_at: Option<i64> = row.get(7)?;

    Ok(PriceAlert {
        id: row.get(0)?,
        account_id: row.get(1)?,
        symbol: row.get(2)?,
        target_price: decimal_column(row.get(3)?, 3)?,
        direction: if direction == "above" {
            AlertDirection::Above
        } else {
            AlertDirection::Below
        },
        status: if status == "triggered" {
            AlertStatus::Triggered
        } else {
            AlertStatus::Active
        },
        created_at: timestamp_column(row.get(6)?),
        triggered_at: triggered_at.map(timestamp_column),
    })
}

fn order_status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Filled => "filled",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn trade_status_str(status: TradeStatus) -> &'static str {
    match status {
        TradeStatus::Completed => "completed",
        TradeStatus::Pending => "pending",
        TradeStatus::Cancelled => "cancelled",
    }
}

fn alert_status_str(status: AlertStatus) -> &'static str {
    match status {
        AlertStatus::Active => "active",
        AlertStatus::Triggered => "triggered",
    }
}

impl AccountRepository for SqliteAccountStore {
    fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let account = conn
            .query_row(
                r#"
                SELECT id, balance, holdings, is_active, created_at, version
                FROM accounts WHERE id = ?1
                "#,
                params![id],
                row_to_account,
            )
            .optional()
            .map_err(StoreError::Database)?;

        Ok(account)
    }

    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let holdings_json = serde_json::to_string(&account.holdings)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO accounts (id, balance, holdings, is_active, created_at, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                account.id,
                account.balance.to_string(),
                holdings_json,
                account.is_active,
                account.created_at.timestamp(),
                account.version as i64,
            ],
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    fn save_account(&self, account: &Account) -> Result<Account, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let holdings_json = serde_json::to_string(&account.holdings)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let updated = conn
            .execute(
                r#"
                UPDATE accounts
                SET balance = ?2, holdings = ?3, is_active = ?4, version = version + 1
                WHERE id = ?1 AND version = ?5
                "#,
                params![
                    account.id,
                    account.balance.to_string(),
                    holdings_json,
                    account.is_active,
                    account.version as i64,
                ],
            )
            .map_err(StoreError::Database)?;

        if updated == 0 {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT version FROM accounts WHERE id = ?1",
                    params![account.id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::Database)?;

            return match exists {
                Some(_) => Err(StoreError::Conflict(account.id.clone())),
                None => Err(StoreError::NotFound(account.id.clone())),
            };
        }

        let mut saved = account.clone();
        saved.version += 1;
        Ok(saved)
    }

    fn append_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute(
            r#"
            INSERT INTO trades (id, account_id, side, symbol, amount, price, quantity, status, executed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                trade.id,
                trade.account_id,
                trade.side.as_str(),
                trade.symbol,
                trade.amount.to_string(),
                trade.price.to_string(),
                trade.quantity.to_string(),
                trade_status_str(trade.status),
                trade.executed_at.timestamp(),
            ],
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    fn trades_for(&self, account_id: &str) -> Result<Vec<Trade>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, account_id, side, symbol, amount, price, quantity, status, executed_at
                FROM trades
                WHERE account_id = ?1
                ORDER BY executed_at ASC, id ASC
                "#,
            )
            .map_err(StoreError::Database)?;

        let trades = stmt
            .query_map(params![account_id], row_to_trade)
            .map_err(StoreError::Database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)?;

        Ok(trades)
    }

    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute(
            r#"
            INSERT INTO orders (id, account_id, side, symbol, amount, limit_price, status, created_at, filled_at, trade_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                order.id,
                order.account_id,
                order.side.as_str(),
                order.symbol,
                order.amount.to_string(),
                order.limit_price.to_string(),
                order_status_str(order.status),
                order.created_at.timestamp(),
                order.filled_at.map(|t| t.timestamp()),
                order.trade_id,
            ],
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let order = conn
            .query_row(
                r#"
                SELECT id, account_id, side, symbol, amount, limit_price, status, created_at, filled_at, trade_id
                FROM orders WHERE id = ?1
                "#,
                params![id],
                row_to_order,
            )
            .optional()
            .map_err(StoreError::Database)?;

        Ok(order)
    }

    fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute(
            r#"
            UPDATE orders
            SET status = ?2, filled_at = ?3, trade_id = ?4
            WHERE id = ?1
            "#,
            params![
                order.id,
                order_status_str(order.status),
                order.filled_at.map(|t| t.timestamp()),
                order.trade_id,
            ],
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    fn pending_orders(&self) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, account_id, side, symbol, amount, limit_price, status, created_at, filled_at, trade_id
                FROM orders
                WHERE status = 'pending'
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .map_err(StoreError::Database)?;

        let orders = stmt
            .query_map([], row_to_order)
            .map_err(StoreError::Database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)?;

        Ok(orders)
    }

    fn orders_for(&self, account_id: &str) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, account_id, side, symbol, amount, limit_price, status, created_at, filled_at, trade_id
                FROM orders
                WHERE account_id = ?1
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .map_err(StoreError::Database)?;

        let orders = stmt
            .query_map(params![account_id], row_to_order)
            .map_err(StoreError::Database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)?;

        Ok(orders)
    }

    fn insert_alert(&self, alert: &PriceAlert) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute(
            r#"
            INSERT INTO alerts (id, account_id, symbol, target_price, direction, status, created_at, triggered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                alert.id,
                alert.account_id,
                alert.symbol,
                alert.target_price.to_string(),
                alert.direction.as_str(),
                alert_status_str(alert.status),
                alert.created_at.timestamp(),
                alert.triggered_at.map(|t| t.timestamp()),
            ],
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    fn alerts_for(&self, account_id: &str) -> Result<Vec<PriceAlert>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, account_id, symbol, target_price, direction, status, created_at, triggered_at
                FROM alerts
                WHERE account_id = ?1
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .map_err(StoreError::Database)?;

        let alerts = stmt
            .query_map(params![account_id], row_to_alert)
            .map_err(StoreError::Database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)?;

        Ok(alerts)
    }

    fn active_alerts(&self) -> Result<Vec<PriceAlert>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, account_id, symbol, target_price, direction, status, created_at, triggered_at
                FROM alerts
                WHERE status = 'active'
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .map_err(StoreError::Database)?;

        let alerts = stmt
            .query_map([], row_to_alert)
            .map_err(StoreError::Database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)?;

        Ok(alerts)
    }

    fn update_alert(&self, alert: &PriceAlert) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute(
            r#"
            UPDATE alerts
            SET status = ?2, triggered_at = ?3
            WHERE id = ?1
            "#,
            params![
                alert.id,
                alert_status_str(alert.status),
                alert.triggered_at.map(|t| t.timestamp()),
            ],
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    fn delete_alert(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let deleted = conn
            .execute("DELETE FROM alerts WHERE id = ?1", params![id])
            .map_err(StoreError::Database)?;

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_account(id: &str) -> Account {
        Account::new(id, dec!(10000))
    }

    #[test]
    fn test_insert_and_get_account() {
        let store = SqliteAccountStore::new_in_memory().unwrap();

        let mut account = test_account("acct-1");
        account.holdings.insert("BTC".to_string(), dec!(0.05));
        store.insert_account(&account).unwrap();

        let loaded = store.get_account("acct-1").unwrap().unwrap();
        assert_eq!(loaded.balance, dec!(10000));
        assert_eq!(loaded.holding("BTC"), dec!(0.05));
        assert!(loaded.is_active);
    }

    #[test]
    fn test_save_bumps_version() {
        let store = SqliteAccountStore::new_in_memory().unwrap();

        let mut account = test_account("acct-1");
        store.insert_account(&account).unwrap();

        account.balance = dec!(7000);
        let saved = store.save_account(&account).unwrap();
        assert_eq!(saved.version, 1);

        let loaded = store.get_account("acct-1").unwrap().unwrap();
        assert_eq!(loaded.balance, dec!(7000));
        assert_eq!(loaded.version, 1);
    }

    #[test]
    fn test_save_with_stale_version_conflicts() {
        let store = SqliteAccountStore::new_in_memory().unwrap();

        let account = test_account("acct-1");
        store.insert_account(&account).unwrap();
        store.save_account(&account).unwrap();

        // Second save still carries version 0
        let result = store.save_account(&account);
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_save_missing_account() {
        let store = SqliteAccountStore::new_in_memory().unwrap();
        let account = test_account("ghost");
        assert!(matches!(
            store.save_account(&account),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_trades_roundtrip_in_order() {
        let store = SqliteAccountStore::new_in_memory().unwrap();

        for (i, price) in [dec!(60000), dec!(61000), dec!(62000)].iter().enumerate() {
            let trade = Trade {
                id: format!("trade-{}", i),
                account_id: "acct-1".to_string(),
                side: TradeSide::Buy,
                symbol: "BTC".to_string(),
                amount: dec!(100),
                price: *price,
                quantity: dec!(100) / price,
                status: TradeStatus::Completed,
                executed_at: Utc::now() + chrono::Duration::seconds(i as i64),
            };
            store.append_trade(&trade).unwrap();
        }

        let trades = store.trades_for("acct-1").unwrap();
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].id, "trade-0");
        assert_eq!(trades[2].price, dec!(62000));
        // Exact decimal round-trip through the TEXT column
        assert_eq!(trades[0].quantity, dec!(100) / dec!(60000));
    }

    #[test]
    fn test_order_lifecycle_persistence() {
        let store = SqliteAccountStore::new_in_memory().unwrap();

        let mut order = Order {
            id: "order-1".to_string(),
            account_id: "acct-1".to_string(),
            side: TradeSide::Buy,
            symbol: "BTC".to_string(),
            amount: dec!(500),
            limit_price: dec!(58000),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            filled_at: None,
            trade_id: None,
        };
        store.insert_order(&order).unwrap();

        assert_eq!(store.pending_orders().unwrap().len(), 1);

        order.status = OrderStatus::Filled;
        order.filled_at = Some(Utc::now());
        order.trade_id = Some("trade-9".to_string());
        store.update_order(&order).unwrap();

        assert!(store.pending_orders().unwrap().is_empty());
        let loaded = store.get_order("order-1").unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Filled);
        assert_eq!(loaded.trade_id.as_deref(), Some("trade-9"));
    }

    #[test]
    fn test_alert_activation_and_delete() {
        let store = SqliteAccountStore::new_in_memory().unwrap();

        let mut alert = PriceAlert {
            id: "alert-1".to_string(),
            account_id: "acct-1".to_string(),
            symbol: "ETH".to_string(),
            target_price: dec!(4000),
            direction: AlertDirection::Above,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            triggered_at: None,
        };
        store.insert_alert(&alert).unwrap();

        assert_eq!(store.active_alerts().unwrap().len(), 1);

        alert.status = AlertStatus::Triggered;
        alert.triggered_at = Some(Utc::now());
        store.update_alert(&alert).unwrap();

        assert!(store.active_alerts().unwrap().is_empty());
        assert_eq!(store.alerts_for("acct-1").unwrap().len(), 1);

        assert!(store.delete_alert("alert-1").unwrap());
        assert!(!store.delete_alert("alert-1").unwrap());
    }
}
