//! Core types for the Paper Trading Terminal
//!
//! This crate defines the shared data structures used across the terminal,
//! including accounts, trades, orders, market data, and price alerts.

pub mod account;
pub mod alert;
pub mod error;
pub mod market;
pub mod websocket;

pub use account::{Account, Order, OrderStatus, Trade, TradeSide, TradeStatus};
pub use alert::{AlertDirection, AlertStatus, PriceAlert};
pub use error::{EngineError, EngineResult};
pub use market::{
    Candle, CandleSeries, ChartPoint, PricePoint, PriceSnapshot, SnapshotSource,
};
pub use websocket::{
    Channel, ChannelKind, ClientMessage, ErrorCode, ServerMessage, SubscriptionKey,
};
