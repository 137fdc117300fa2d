//! WebSocket message types for real-time streaming
//!
//! These types define the protocol for WebSocket communication between
//! the server and clients.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PriceAlert, SnapshotSource, Trade};

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a channel
    Subscribe {
        /// Channel to subscribe to
        channel: Channel,
    },
    /// Unsubscribe from a channel
    Unsubscribe {
        /// Channel to unsubscribe from
        channel: Channel,
    },
    /// Ping to keep connection alive
    Ping {
        /// Client timestamp
        timestamp: i64,
    },
}

/// Channels available for subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Channel {
    /// Price ticks for one symbol
    Ticker { symbol: String },
    /// Trade confirmations for one account
    Trades { account_id: String },
    /// Alert triggers for one account
    Alerts { account_id: String },
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription confirmed
    Subscribed { channel: Channel },
    /// Unsubscription confirmed
    Unsubscribed { channel: Channel },
    /// Price tick for a symbol
    PriceUpdate {
        symbol: String,
        price: Decimal,
        change_24h: Decimal,
        source: SnapshotSource,
        timestamp: DateTime<Utc>,
    },
    /// A trade was executed against a subscribed account
    TradeExecuted { trade: Trade },
    /// A price alert fired
    AlertTriggered { alert: PriceAlert },
    /// Error message
    Error { code: ErrorCode, message: String },
    /// Pong response to client ping
    Pong {
        /// Echo back client timestamp
        client_timestamp: i64,
        /// Server timestamp
        server_timestamp: i64,
    },
}

/// Error codes for WebSocket errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Invalid message format
    InvalidMessage,
    /// Unknown channel
    UnknownChannel,
    /// Internal server error
    InternalError,
}

// ============================================================================
// Subscription Key (for internal use)
// ============================================================================

/// Unique key for a subscription (used in the notification hub)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub kind: ChannelKind,
    /// Symbol for ticker channels, account id for the others
    pub topic: String,
}

/// Channel family for subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Ticker,
    Trades,
    Alerts,
}

impl From<&Channel> for SubscriptionKey {
    fn from(channel: &Channel) -> Self {
        match channel {
            Channel::Ticker { symbol } => Self {
                kind: ChannelKind::Ticker,
                topic: symbol.clone(),
            },
            Channel::Trades { account_id } => Self {
                kind: ChannelKind::Trades,
                topic: account_id.clone(),
            },
            Channel::Alerts { account_id } => Self {
                kind: ChannelKind::Alerts,
                topic: account_id.clone(),
            },
        }
    }
}

impl SubscriptionKey {
    /// Key for a symbol's price ticks
    pub fn ticker(symbol: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Ticker,
            topic: symbol.into(),
        }
    }

    /// Key for an account's trade confirmations
    pub fn trades(account_id: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Trades,
            topic: account_id.into(),
        }
    }

    /// Key for an account's alert triggers
    pub fn alerts(account_id: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Alerts,
            topic: account_id.into(),
        }
    }
}
