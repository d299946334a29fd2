//! Health check endpoint
//!
//! Reports uptime, the last collaborator error, and whether the
//! collaborator answers its own health probe.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when the collaborator is reachable, otherwise "degraded"
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend_reachable: bool,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let backend_reachable = match state.backend.health().await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Collaborator health probe failed");
            false
        }
    };

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if backend_reachable { "ok" } else { "degraded" }.to_string(),
        module: "bgm-scene".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        backend_reachable,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
