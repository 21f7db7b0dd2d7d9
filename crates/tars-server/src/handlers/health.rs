//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use tars_store::SessionHistory;

use crate::model::ModelBackend;
use crate::state::ServerState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Active model backend.
    pub model: &'static str,
    /// Sessions with recorded history, if the store could count them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<usize>,
}

/// Health check handler.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "model": "ollama",
///   "sessions": 2
/// }
/// ```
pub async fn health<M, H>(State(state): State<Arc<ServerState<M, H>>>) -> impl IntoResponse
where
    M: ModelBackend + 'static,
    H: SessionHistory + 'static,
{
    let sessions = match state.history.session_count() {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count sessions");
            None
        }
    };

    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model.name(),
        sessions,
    };

    (StatusCode::OK, Json(response))
}
