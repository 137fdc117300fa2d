//! Market data endpoints: prices, history, indicators

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use paper_core::{EngineError, PricePoint, SnapshotSource};
use paper_services::indicators;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error_response;
use crate::AppState;

/// Response for the full price list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricesResponse {
    pub prices: Vec<PricePoint>,
    pub source: SnapshotSource,
    pub refreshed_at: DateTime<Utc>,
}

/// Query parameters for history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Number of days of daily candles (default 30)
    pub days: Option<u32>,
}

/// Query parameters for indicators
#[derive(Debug, Deserialize)]
pub struct IndicatorQuery {
    /// Days of history to compute over (default 30)
    pub days: Option<u32>,
    /// Which indicator: sma, ema, rsi, macd, bollinger
    pub indicator: String,
    /// Period for sma/ema/rsi/bollinger (default 14, bollinger 20)
    pub period: Option<usize>,
    /// Band width in standard deviations for bollinger (default 2)
    pub k: Option<Decimal>,
}

/// Indicator values over a symbol's close series
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResponse {
    pub symbol: String,
    pub indicator: String,
    pub days: u32,
    /// True when the underlying close series came from the synthetic
    /// fallback rather than upstream data
    pub synthetic: bool,
    pub values: serde_json::Value,
}

/// Create market data routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/prices", get(list_prices))
        .route("/prices/{symbol}", get(get_price))
        .route("/history/{symbol}", get(get_history))
        .route("/indicators/{symbol}", get(get_indicators))
}

/// Current prices for all tracked symbols
async fn list_prices(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.feed.current();
    let mut prices: Vec<PricePoint> = snapshot.prices.values().cloned().collect();
    prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    Json(PricesResponse {
        prices,
        source: snapshot.source,
        refreshed_at: snapshot.refreshed_at,
    })
}

/// Current price for one symbol
async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let symbol = symbol.to_uppercase();
    let snapshot = state.feed.current();
    match snapshot.prices.get(&symbol) {
        Some(point) => (StatusCode::OK, Json(point.clone())).into_response(),
        None => error_response(EngineError::no_price(symbol)).into_response(),
    }
}

/// Daily candle history for a symbol
async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    let symbol = symbol.to_uppercase();
    let days = params.days.unwrap_or(30);
    info!("History request: {} over {} days", symbol, days);

    match state.history.series(&symbol, days).await {
        Ok(series) => (StatusCode::OK, Json(series)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Indicator values computed over a symbol's daily closes
async fn get_indicators(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<IndicatorQuery>,
) -> impl IntoResponse {
    let symbol = symbol.to_uppercase();
    let days = params.days.unwrap_or(30);

    let series = match state.history.series(&symbol, days).await {
        Ok(series) => series,
        Err(e) => return error_response(e).into_response(),
    };
    let closes = series.closes();

    let indicator = params.indicator.to_lowercase();
    let values = match indicator.as_str() {
        "sma" => indicators::sma(&closes, params.period.unwrap_or(14))
            .map(|v| serde_json::json!(v)),
        "ema" => indicators::ema(&closes, params.period.unwrap_or(14))
            .map(|v| serde_json::json!(v)),
        "rsi" => indicators::rsi(&closes, params.period.unwrap_or(14))
            .map(|v| serde_json::json!(v)),
        "macd" => indicators::macd(&closes).map(|v| serde_json::json!(v)),
        "bollinger" => indicators::bollinger(
            &closes,
            params.period.unwrap_or(20),
            params.k.unwrap_or_else(|| Decimal::TWO),
        )
        .map(|v| serde_json::json!(v)),
        other => Err(EngineError::invalid_parameter(format!(
            "unknown indicator: {}",
            other
        ))),
    };

    match values {
        Ok(values) => (
            StatusCode::OK,
            Json(IndicatorResponse {
                symbol,
                indicator,
                days,
                synthetic: series.synthetic,
                values,
            }),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
