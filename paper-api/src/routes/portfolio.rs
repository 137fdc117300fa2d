//! Portfolio valuation and performance endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use super::error_response;
use crate::AppState;

/// Create portfolio routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/{id}/portfolio", get(get_valuation))
        .route("/accounts/{id}/performance", get(get_performance))
}

/// Value an account against the current price snapshot
async fn get_valuation(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.portfolio.value(&id) {
        Ok(valuation) => (StatusCode::OK, Json(valuation)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Performance statistics replayed from the trade ledger
async fn get_performance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.portfolio.performance(&id) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
