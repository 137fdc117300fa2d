//! API route definitions

mod accounts;
mod alerts;
mod health;
mod markets;
mod portfolio;
mod trading;
pub mod ws;

use axum::{http::StatusCode, Json, Router};
use paper_core::EngineError;
use serde::Serialize;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(markets::routes())
        .merge(accounts::routes())
        .merge(trading::routes())
        .merge(portfolio::routes())
        .merge(alerts::routes())
        .merge(health::routes())
}

/// Create WebSocket routes (separate from API)
pub fn ws_routes() -> Router<AppState> {
    ws::routes()
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an engine error to an HTTP response
pub fn error_response(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        EngineError::InvalidAmount(_) | EngineError::InvalidParameter(_) => {
            StatusCode::BAD_REQUEST
        }
        EngineError::AccountNotFound(_) | EngineError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::AccountInactive(_) => StatusCode::FORBIDDEN,
        EngineError::InsufficientBalance { .. } | EngineError::InsufficientHoldings { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::NoPriceAvailable(_) | EngineError::UpstreamUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        EngineError::Conflict(_) | EngineError::AlreadyFilled(_) => StatusCode::CONFLICT,
        EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
