//! Price alert types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction a price must cross to trigger an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    /// Trigger when the price reaches or exceeds the target
    Above,
    /// Trigger when the price reaches or falls below the target
    Below,
}

impl AlertDirection {
    /// String form used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
        }
    }
}

/// Status of a price alert
///
/// Active alerts move to Triggered exactly once; there is no re-arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Triggered,
}

/// A price alert owned by an account
///
/// Evaluated against every price feed refresh tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    /// Unique alert identifier
    pub id: String,

    /// Account that owns the alert
    pub account_id: String,

    /// Asset symbol the alert watches
    pub symbol: String,

    /// Price level to watch for
    pub target_price: Decimal,

    /// Which way the price must cross
    pub direction: AlertDirection,

    /// Active or triggered
    pub status: AlertStatus,

    /// When the alert was created
    pub created_at: DateTime<Utc>,

    /// When the alert fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
}

impl PriceAlert {
    /// Whether `price` satisfies the alert condition
    pub fn is_satisfied_by(&self, price: Decimal) -> bool {
        match self.direction {
            AlertDirection::Above => price >= self.target_price,
            AlertDirection::Below => price <= self.target_price,
        }
    }
}
