//! Health check endpoint

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::exchange::timestamp_now;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub voicebot_initialized: bool,
    pub timestamp: String,
    pub version: &'static str,
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    // The router only exists once the pipeline has been built
    Json(HealthResponse {
        status: "healthy",
        voicebot_initialized: true,
        timestamp: timestamp_now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build health check router
pub fn router() -> Router {
    Router::new().route("/api/health", get(health))
}
