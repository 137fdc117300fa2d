//! CoinGecko response types and symbol mapping

use rust_decimal::Decimal;
use serde::Deserialize;

/// Trading symbols and their CoinGecko coin ids
///
/// This is the platform's default pair set; the feed tracks exactly these
/// unless configured otherwise.
const COINS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("XRP", "ripple"),
];

/// CoinGecko coin id for a trading symbol
pub fn coin_id(symbol: &str) -> Option<&'static str> {
    COINS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, id)| *id)
}

/// Trading symbol for a CoinGecko coin id
pub fn symbol_for_id(id: &str) -> Option<&'static str> {
    COINS
        .iter()
        .find(|(_, i)| *i == id)
        .map(|(s, _)| *s)
}

/// The default set of tracked symbols
pub fn tracked_symbols() -> Vec<String> {
    COINS.iter().map(|(s, _)| s.to_string()).collect()
}

/// One entry of a `/simple/price` response, keyed by coin id
#[derive(Debug, Clone, Deserialize)]
pub struct SimplePriceEntry {
    /// Spot price in USD
    pub usd: Option<Decimal>,
    /// Market capitalisation in USD
    pub usd_market_cap: Option<Decimal>,
    /// 24h traded volume in USD
    pub usd_24h_vol: Option<Decimal>,
    /// 24h change in percent
    pub usd_24h_change: Option<Decimal>,
}

/// Response from `/coins/{id}/market_chart`
///
/// Timestamps arrive in milliseconds and occasionally as floats, hence f64.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartResponse {
    /// (timestamp ms, price) pairs
    pub prices: Vec<(f64, Decimal)>,
    /// (timestamp ms, 24h volume) pairs, same cadence as `prices`
    #[serde(default)]
    pub total_volumes: Vec<(f64, Decimal)>,
}
