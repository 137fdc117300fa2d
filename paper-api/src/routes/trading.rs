//! Trading endpoints: market orders, resting limit orders, trade history

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use paper_core::TradeSide;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::error_response;
use crate::AppState;

/// Request to execute a market order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub account_id: String,
    pub side: TradeSide,
    pub symbol: String,
    /// Notional amount in quote currency
    pub amount: Decimal,
    /// Optional fill price; the market price is used when absent
    pub price: Option<Decimal>,
}

/// Request to place a resting limit order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub account_id: String,
    pub side: TradeSide,
    pub symbol: String,
    pub amount: Decimal,
    pub limit_price: Decimal,
}

/// Create trading routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trades", post(execute_trade))
        .route("/accounts/{id}/trades", get(list_trades))
        .route("/orders", post(place_order))
        .route("/orders/{id}", delete(cancel_order))
        .route("/accounts/{id}/orders", get(list_orders))
}

/// Execute a simulated market order
async fn execute_trade(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> impl IntoResponse {
    info!(
        "Trade request: {} {} {} for {}",
        request.side.as_str(),
        request.amount,
        request.symbol,
        request.account_id
    );
    let symbol = request.symbol.to_uppercase();
    match state
        .engine
        .execute(
            &request.account_id,
            request.side,
            &symbol,
            request.amount,
            request.price,
        )
        .await
    {
        Ok(trade) => (StatusCode::CREATED, Json(trade)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Trade ledger for an account, oldest first
async fn list_trades(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.engine.trades(&id) {
        Ok(trades) => (StatusCode::OK, Json(trades)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Place a resting limit order
async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> impl IntoResponse {
    info!(
        "Limit order request: {} {} {} @ {} for {}",
        request.side.as_str(),
        request.amount,
        request.symbol,
        request.limit_price,
        request.account_id
    );
    let symbol = request.symbol.to_uppercase();
    match state
        .engine
        .place_limit(
            &request.account_id,
            request.side,
            &symbol,
            request.amount,
            request.limit_price,
        )
        .await
    {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Cancel a pending order
async fn cancel_order(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.engine.cancel(&id) {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Orders for an account, newest first
async fn list_orders(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.engine.orders(&id) {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
