//! Interaction log and session history endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::exchange::{Exchange, HistoryEntry};
use crate::log_store::DEFAULT_RECENT_LIMIT;

/// Build logs and history router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/get-logs", get(get_logs))
        .route(
            "/api/sessions/{session_id}/history",
            get(get_history).delete(clear_history),
        )
        .with_state(state)
}

/// Optional filters for the log listing
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub logs: Vec<Exchange>,
}

async fn get_logs(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let pipeline = state.pipeline.clone();

    let logs = tokio::task::spawn_blocking(move || match params.session_id {
        Some(id) => pipeline.session_logs(&id, limit),
        None => pipeline.recent_logs(limit),
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Error retrieving logs: {e}")))?;

    Ok(Json(LogsResponse {
        success: true,
        logs,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
}

async fn get_history(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let history = state.pipeline.history(&session_id);
    Json(HistoryResponse {
        success: true,
        session_id,
        history,
    })
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub session_id: String,
    /// Whether the session had any history to forget
    pub cleared: bool,
}

async fn clear_history(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    let cleared = state.pipeline.clear_history(&session_id);
    tracing::info!(session_id = %session_id, cleared, "session history cleared");
    Json(ClearResponse {
        success: true,
        session_id,
        cleared,
    })
}
