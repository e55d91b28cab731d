//! Health check handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::realtime::hub::HubStats;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Realtime hub statistics
pub async fn hub_stats(State(state): State<AppState>) -> Json<HubStats> {
    Json(state.hub.stats())
}
