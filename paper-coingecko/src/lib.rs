//! CoinGecko integration for the Paper Trading Terminal
//!
//! This crate provides a client for the public CoinGecko API, which serves
//! spot prices and market charts without requiring authentication.
//!
//! For higher rate limits, set the optional environment variable:
//! - `COINGECKO_API_KEY` - A CoinGecko demo API key

pub mod client;
pub mod types;

pub use client::{CoinGeckoClient, CoinGeckoError};
pub use types::{coin_id, symbol_for_id, tracked_symbols, MarketChartResponse, SimplePriceEntry};
