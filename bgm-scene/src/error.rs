//! Error types for bgm-scene
//!
//! `SceneError` is what the orchestration services return; `ApiError`
//! turns it into an HTTP response.

use crate::models::{EvaluationError, ParamError};
use crate::services::BackendError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Orchestration error
#[derive(Debug, Clone, Error)]
pub enum SceneError {
    #[error("No scene has been decomposed yet")]
    NoScene,

    #[error("Cue not found: {0}")]
    CueNotFound(Uuid),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),

    #[error("Invalid evaluation: {0}")]
    InvalidEvaluation(#[from] EvaluationError),

    /// Mix requested with no Ready cues
    #[error("No cues are ready to mix")]
    NothingToMix,

    #[error("No master artifact has been mixed yet")]
    NoMaster,

    #[error("Master artifact not found: {0}")]
    ArtifactNotFound(Uuid),

    #[error("Decomposition produced no usable cues")]
    EmptyDecomposition,

    /// A newer decomposition replaced the scene while a call was in flight
    #[error("Scene was replaced while the request was in flight")]
    SceneReplaced,

    #[error("Collaborator call failed: {0}")]
    Backend(#[from] BackendError),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict with current scene state (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Collaborator failure (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

impl From<SceneError> for ApiError {
    fn from(err: SceneError) -> Self {
        let message = err.to_string();
        match err {
            SceneError::NoScene
            | SceneError::CueNotFound(_)
            | SceneError::NoMaster
            | SceneError::ArtifactNotFound(_) => {
                ApiError::NotFound(message)
            }
            SceneError::InvalidParameter(_) | SceneError::InvalidEvaluation(_) => {
                ApiError::BadRequest(message)
            }
            SceneError::NothingToMix | SceneError::SceneReplaced => ApiError::Conflict(message),
            SceneError::Backend(_) | SceneError::EmptyDecomposition => {
                ApiError::BadGateway(message)
            }
        }
    }
}

/// Malformed or mistyped request bodies are reported like any other bad input
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
