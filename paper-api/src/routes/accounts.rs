//! Account management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::error_response;
use crate::AppState;

/// Request to open an account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub id: String,
}

/// Request to adjust an account's balance (admin)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceRequest {
    /// Signed amount; negative debits clamp at zero
    pub delta: Decimal,
}

/// Create account routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(open_account))
        .route("/accounts/{id}", get(get_account))
        .route("/accounts/{id}/deactivate", post(deactivate_account))
        .route("/accounts/{id}/balance", post(adjust_balance))
}

/// Open a new account with the starting balance
async fn open_account(
    State(state): State<AppState>,
    Json(request): Json<OpenAccountRequest>,
) -> impl IntoResponse {
    info!("Opening account: {}", request.id);
    match state.engine.open_account(&request.id) {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Fetch an account
async fn get_account(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.engine.account(&id) {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Soft-deactivate an account
async fn deactivate_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Deactivating account: {}", id);
    match state.engine.deactivate(&id).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Adjust an account's balance
async fn adjust_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AdjustBalanceRequest>,
) -> impl IntoResponse {
    info!("Adjusting balance of {} by {}", id, request.delta);
    match state.engine.adjust_balance(&id, request.delta).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
