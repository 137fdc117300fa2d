//! Market data structures: prices, snapshots, and OHLCV candles

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a snapshot's prices came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Fetched from the upstream provider
    Live,
    /// Built-in reference prices, used until the first successful refresh
    Fallback,
}

/// Last traded price and daily statistics for one trading pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Asset symbol (e.g. "BTC")
    pub symbol: String,

    /// Display pair (e.g. "BTC/USDT")
    pub pair: String,

    /// Last price in quote currency (always positive)
    pub price: Decimal,

    /// 24h change in percent, signed
    pub change_24h: Decimal,

    /// 24h traded volume in quote currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,

    /// Market capitalisation in quote currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,

    /// When this price was observed
    pub updated_at: DateTime<Utc>,
}

/// Immutable view of all tracked prices at one refresh instant
///
/// The feed swaps whole snapshots behind an `Arc`; a snapshot is never
/// mutated in place, so readers cannot observe a torn update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Prices keyed by asset symbol; never empty
    pub prices: HashMap<String, PricePoint>,

    /// Whether these prices are live or fallback data
    pub source: SnapshotSource,

    /// When the snapshot was taken
    pub refreshed_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Look up the current price for a symbol
    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).map(|p| p.price)
    }

    /// Whether the snapshot came from the upstream provider
    pub fn is_live(&self) -> bool {
        self.source == SnapshotSource::Live
    }
}

/// A single raw point from an upstream price chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// When the point was sampled
    pub timestamp: DateTime<Utc>,
    /// Price at that instant
    pub price: Decimal,
    /// Traded volume reported for that instant
    pub volume: Decimal,
}

/// A single OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Start time of the candle
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: Decimal,
    /// Highest price during the period
    pub high: Decimal,
    /// Lowest price during the period
    pub low: Decimal,
    /// Closing price
    pub close: Decimal,
    /// Trading volume during the period
    pub volume: Decimal,
}

impl Candle {
    /// Check if this is a bullish candle (close > open)
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Get the candle range (high - low)
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

/// Daily price history for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    /// Asset symbol
    pub symbol: String,

    /// Number of days covered
    pub days: u32,

    /// Candles sorted by timestamp ascending (oldest first)
    pub candles: Vec<Candle>,

    /// True when generated by the synthetic fallback rather than fetched
    /// from upstream data
    pub synthetic: bool,
}

impl CandleSeries {
    /// Get the most recent candle
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Closing prices in chronological order, ready for the indicator
    /// functions
    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
