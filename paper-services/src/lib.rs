//! Business logic services for the Paper Trading Terminal
//!
//! This crate provides the simulation core: the price feed with its
//! fallback semantics, historical candle generation, technical indicators,
//! order execution against simulated accounts, portfolio valuation, price
//! alerts, and the notification hub that fans updates out to clients.

pub mod alerts;
pub mod execution;
pub mod history;
pub mod indicators;
pub mod notifications;
pub mod portfolio;
pub mod price_feed;
pub mod source;
pub mod store;

pub use alerts::AlertService;
pub use execution::{starting_balance, ExecutionEngine};
pub use history::{HistoryService, RandomWalk, SyntheticSeriesPolicy};
pub use indicators::{BollingerBand, MacdPoint};
pub use notifications::{BroadcastMessage, ClientId, NotificationHub};
pub use portfolio::{
    HoldingValuation, MetricsBasis, PerformanceReport, PortfolioService, PortfolioValuation,
};
pub use price_feed::{FeedError, PriceFeed, PriceFeedHandle, DEFAULT_REFRESH_PERIOD};
pub use source::MarketDataSource;
pub use store::{AccountRepository, SqliteAccountStore, StoreError};
