//! HTTP API server for the voicebot web UI

pub mod health;
pub mod interact;
pub mod logs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::ServerConfig;
use crate::pipeline::InteractionPipeline;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: InteractionPipeline,
}

impl ApiState {
    #[must_use]
    pub const fn new(pipeline: InteractionPipeline) -> Self {
        Self { pipeline }
    }
}

/// Build the router with all routes
///
/// When `static_dir` is set, unmatched paths are served from it with
/// `index.html` as the fallback page.
pub fn router(state: Arc<ApiState>, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .merge(interact::router(state.clone()))
        .merge(logs::router(state))
        .merge(health::router());

    if let Some(static_dir) = static_dir {
        let index_file = static_dir.join("index.html");
        let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

        router = router.fallback_service(serve_dir);
        tracing::info!(path = %static_dir.display(), "serving static files");
    }

    // The web UI may be served from another origin during development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    #[must_use]
    pub fn new(pipeline: InteractionPipeline, config: &ServerConfig) -> Self {
        Self {
            state: Arc::new(ApiState::new(pipeline)),
            host: config.host.clone(),
            port: config.port,
            static_dir: config.static_dir.clone(),
        }
    }

    /// Run the API server until the process is interrupted
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server on {addr}: {e}")))?;

        tracing::info!(host = %self.host, port = self.port, "API server listening");

        let app = router(self.state, self.static_dir.as_deref());
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown requested");
                }
            })
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// API errors, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
