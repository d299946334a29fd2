//! Per-cue API handlers
//!
//! GET /scene/cues, GET/PATCH /scene/cues/:id,
//! POST /scene/cues/:id/regenerate, GET /scene/cues/:id/envelope

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiResult, SceneError},
    models::{Cue, CuePatch},
    services::RegenerationReport,
    AppState,
};

use super::scene::report_failure;

const DEFAULT_ENVELOPE_POINTS: usize = 100;
const MAX_ENVELOPE_POINTS: usize = 2000;

/// POST /scene/cues/:id/regenerate request
#[derive(Debug, Default, Deserialize)]
pub struct RegenerateRequest {
    /// Replaces the prompt (or narration text) before regenerating
    #[serde(default)]
    pub prompt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnvelopeQuery {
    pub points: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvelopePoint {
    pub offset_ms: u64,
    /// Linear gain multiplier
    pub gain: f32,
}

/// GET /scene/cues/:id/envelope response
#[derive(Debug, Serialize)]
pub struct EnvelopeResponse {
    pub cue_id: Uuid,
    pub duration_ms: u64,
    pub points: Vec<EnvelopePoint>,
}

/// Sample the gain envelope of `cue` at `points` evenly spaced offsets
///
/// Narration is mixed flat, so its envelope is constant 1.0.
pub fn sample_envelope(cue: &Cue, points: usize) -> Vec<EnvelopePoint> {
    let points = points.clamp(2, MAX_ENVELOPE_POINTS);
    let duration_ms = cue.duration_ms();
    (0..points)
        .map(|i| {
            let offset_ms = (duration_ms as u128 * i as u128 / (points - 1) as u128) as u64;
            let gain = cue
                .mix()
                .map(|mix| mix.envelope_at(offset_ms, duration_ms))
                .unwrap_or(1.0);
            EnvelopePoint { offset_ms, gain }
        })
        .collect()
}

/// GET /scene/cues
///
/// All cues in timeline order.
pub async fn list_cues(State(state): State<AppState>) -> ApiResult<Json<Vec<Cue>>> {
    let guard = state.scene.read().await;
    let scene = guard.as_ref().ok_or(SceneError::NoScene)?;
    Ok(Json(scene.registry.list().to_vec()))
}

/// GET /scene/cues/:id
pub async fn get_cue(
    State(state): State<AppState>,
    Path(cue_id): Path<Uuid>,
) -> ApiResult<Json<Cue>> {
    let guard = state.scene.read().await;
    let scene = guard.as_ref().ok_or(SceneError::NoScene)?;
    let cue = scene
        .registry
        .get(cue_id)
        .ok_or(SceneError::CueNotFound(cue_id))?;
    Ok(Json(cue.clone()))
}

/// PATCH /scene/cues/:id
///
/// Edit placement, prompt or mix parameters. Applies immediately in any
/// lifecycle state; the next generation or mix request uses the new values.
pub async fn patch_cue(
    State(state): State<AppState>,
    Path(cue_id): Path<Uuid>,
    body: Result<Json<CuePatch>, JsonRejection>,
) -> ApiResult<Json<Cue>> {
    let Json(patch) = body?;
    let mut guard = state.scene.write().await;
    let scene = guard.as_mut().ok_or(SceneError::NoScene)?;

    if !scene.registry.update(cue_id, &patch).map_err(SceneError::from)? {
        return Err(SceneError::CueNotFound(cue_id).into());
    }
    let cue = scene
        .registry
        .get(cue_id)
        .ok_or(SceneError::CueNotFound(cue_id))?;

    tracing::debug!(cue_id = %cue_id, "Cue parameters updated");
    Ok(Json(cue.clone()))
}

/// POST /scene/cues/:id/regenerate
///
/// Request new audio for one cue. Other cues are not touched.
pub async fn regenerate_cue(
    State(state): State<AppState>,
    Path(cue_id): Path<Uuid>,
    body: Result<Json<RegenerateRequest>, JsonRejection>,
) -> ApiResult<Json<RegenerationReport>> {
    let Json(request) = body?;

    match state
        .pipeline
        .dispatcher
        .regenerate(&state.scene, cue_id, request.prompt_text)
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err(report_failure(&state, "regenerate", e).await),
    }
}

/// GET /scene/cues/:id/envelope?points=N
pub async fn cue_envelope(
    State(state): State<AppState>,
    Path(cue_id): Path<Uuid>,
    Query(query): Query<EnvelopeQuery>,
) -> ApiResult<Json<EnvelopeResponse>> {
    let guard = state.scene.read().await;
    let scene = guard.as_ref().ok_or(SceneError::NoScene)?;
    let cue = scene
        .registry
        .get(cue_id)
        .ok_or(SceneError::CueNotFound(cue_id))?;

    Ok(Json(EnvelopeResponse {
        cue_id,
        duration_ms: cue.duration_ms(),
        points: sample_envelope(cue, query.points.unwrap_or(DEFAULT_ENVELOPE_POINTS)),
    }))
}

/// Build per-cue routes
pub fn cue_routes() -> Router<AppState> {
    Router::new()
        .route("/scene/cues", get(list_cues))
        .route("/scene/cues/:id", get(get_cue).patch(patch_cue))
        .route("/scene/cues/:id/regenerate", post(regenerate_cue))
        .route("/scene/cues/:id/envelope", get(cue_envelope))
}
