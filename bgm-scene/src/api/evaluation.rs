//! Evaluation API handlers
//!
//! POST /scene/evaluations, GET /scene/evaluations

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    error::ApiResult,
    models::{EvaluationRecord, EvaluationSubmission},
    AppState,
};

use super::scene::report_failure;

/// POST /scene/evaluations
///
/// Record reviewer scores against the master artifact or one cue.
/// Returns 201 with the stored record.
pub async fn submit_evaluation(
    State(state): State<AppState>,
    body: Result<Json<EvaluationSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EvaluationRecord>)> {
    let Json(submission) = body?;
    match state.evaluations.submit(&state.scene, submission).await {
        Ok(record) => Ok((StatusCode::CREATED, Json(record))),
        Err(e) => Err(report_failure(&state, "evaluate", e).await),
    }
}

/// GET /scene/evaluations
pub async fn list_evaluations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EvaluationRecord>>> {
    Ok(Json(state.evaluations.list(&state.scene).await?))
}

/// Build evaluation routes
pub fn evaluation_routes() -> Router<AppState> {
    Router::new().route(
        "/scene/evaluations",
        get(list_evaluations).post(submit_evaluation),
    )
}
