//! Text query endpoint used by the web UI

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::exchange::{UserQuery, WEB_VOICE_INTERACTION};
use crate::pipeline::InteractionResult;

/// Cookie carrying the browser's conversation id between requests
pub const SESSION_COOKIE: &str = "voicebot_session";

/// Build interaction router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/process-voice", post(process_voice))
        .with_state(state)
}

/// Query submitted from the browser
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub text: String,
    /// Continue an existing conversation; falls back to the session cookie,
    /// then to a new conversation
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Pipeline result tagged with the conversation it belongs to
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    #[serde(flatten)]
    pub result: InteractionResult,
    pub session_id: String,
}

async fn process_voice(
    State(state): State<Arc<ApiState>>,
    jar: CookieJar,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<ProcessResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let query = UserQuery::parse(request.text.trim())
        .map_err(|_| ApiError::BadRequest("No text provided".to_string()))?;

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            jar.get(SESSION_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|id| !id.trim().is_empty())
        })
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let result = state
        .pipeline
        .process(&query, Some(session_id.as_str()), Some(WEB_VOICE_INTERACTION))
        .await;

    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let cookie = Cookie::build((SESSION_COOKIE, session_id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        status,
        jar.add(cookie),
        Json(ProcessResponse { result, session_id }),
    ))
}
