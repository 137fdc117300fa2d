//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use paper_core::SnapshotSource;
use serde::Serialize;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether current prices are live or fallback data
    pub price_source: SnapshotSource,
    pub prices_refreshed_at: DateTime<Utc>,
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.feed.current();
    Json(HealthResponse {
        status: "ok",
        price_source: snapshot.source,
        prices_refreshed_at: snapshot.refreshed_at,
    })
}
