//! Liveness endpoints.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Create health check routes. Both paths are tenant-exempt by default.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/health", get(health_handler))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Healthy",
        service: state.service_name,
        timestamp: Utc::now(),
    })
}
