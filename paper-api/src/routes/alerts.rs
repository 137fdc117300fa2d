//! Price alert endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use paper_core::AlertDirection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error_response;
use crate::AppState;

/// Request to create a price alert
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub account_id: String,
    pub symbol: String,
    pub target_price: Decimal,
    pub direction: AlertDirection,
}

/// Response for alert deletion
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAlertResponse {
    pub deleted: bool,
}

/// Create alert routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", post(create_alert))
        .route("/alerts/{id}", delete(delete_alert))
        .route("/accounts/{id}/alerts", get(list_alerts))
}

/// Create a price alert
async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> impl IntoResponse {
    let symbol = request.symbol.to_uppercase();
    info!(
        "Creating alert for {}: {} crosses {}",
        request.account_id, symbol, request.target_price
    );
    match state.alerts.create(
        &request.account_id,
        &symbol,
        request.target_price,
        request.direction,
    ) {
        Ok(alert) => (StatusCode::CREATED, Json(alert)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Delete an alert
async fn delete_alert(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.alerts.delete(&id) {
        Ok(deleted) => (StatusCode::OK, Json(DeleteAlertResponse { deleted })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Alerts for an account, newest first
async fn list_alerts(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.alerts.alerts_for(&id) {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
