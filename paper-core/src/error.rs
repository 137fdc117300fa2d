//! Error types for the trading engine

use rust_decimal::Decimal;
use thiserror::Error;

/// Engine-wide error type
///
/// Validation failures are returned synchronously and leave account state
/// untouched. Upstream failures are recovered internally by the price feed
/// and history fallbacks and only surface on paths with no fallback left.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account is inactive: {0}")]
    AccountInactive(String),

    #[error("No price available for {0}")]
    NoPriceAvailable(String),

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("Insufficient holdings of {symbol}: need {needed}, have {available}")]
    InsufficientHoldings {
        symbol: String,
        needed: Decimal,
        available: Decimal,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Conflicting update for account {0}")]
    Conflict(String),

    #[error("Order already filled: {0}")]
    AlreadyFilled(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        EngineError::InvalidAmount(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        EngineError::InvalidParameter(msg.into())
    }

    pub fn account_not_found(id: impl Into<String>) -> Self {
        EngineError::AccountNotFound(id.into())
    }

    pub fn account_inactive(id: impl Into<String>) -> Self {
        EngineError::AccountInactive(id.into())
    }

    pub fn no_price(symbol: impl Into<String>) -> Self {
        EngineError::NoPriceAvailable(symbol.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        EngineError::UpstreamUnavailable(msg.into())
    }

    pub fn conflict(account_id: impl Into<String>) -> Self {
        EngineError::Conflict(account_id.into())
    }

    pub fn already_filled(order_id: impl Into<String>) -> Self {
        EngineError::AlreadyFilled(order_id.into())
    }

    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        EngineError::OrderNotFound(order_id.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        EngineError::Storage(msg.into())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
