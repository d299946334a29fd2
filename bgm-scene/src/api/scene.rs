//! Scene workflow API handlers
//!
//! POST /scene/decompose, POST /scene/run, GET /scene, POST /scene/generate,
//! POST /scene/mix, GET /scene/master, POST /scene/master/metrics
//!
//! Collaborator calls run inline; the response is sent once they resolve.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult, SceneError},
    models::{AutomatedMetrics, MasterArtifact, SceneSummary},
    services::{BatchSummary, DecompositionSummary},
    workflow::PipelineReport,
    AppState,
};

/// POST /scene/decompose request
#[derive(Debug, Deserialize)]
pub struct DecomposeSceneRequest {
    pub story_text: String,
    #[serde(default)]
    pub words_per_second: Option<f32>,
}

/// POST /scene/run request
#[derive(Debug, Deserialize)]
pub struct RunSceneRequest {
    pub story_text: String,
    #[serde(default)]
    pub words_per_second: Option<f32>,
    #[serde(default = "default_auto_mix")]
    pub auto_mix: bool,
}

fn default_auto_mix() -> bool {
    true
}

/// POST /scene/generate request
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// Overrides the decomposition's duration hint
    #[serde(default)]
    pub total_duration_ms: Option<u64>,
}

/// Log a failed operation, keep it for /health, and convert it
pub(crate) async fn report_failure(state: &AppState, operation: &str, err: SceneError) -> ApiError {
    match &err {
        SceneError::Backend(_) | SceneError::EmptyDecomposition => {
            tracing::warn!(operation, error = %err, "Scene operation failed");
            state.record_error(format!("{}: {}", operation, err)).await;
        }
        _ => tracing::debug!(operation, error = %err, "Scene operation rejected"),
    }
    ApiError::from(err)
}

/// POST /scene/decompose
///
/// Replace the current scene with a fresh decomposition. All cues start
/// `Pending`.
pub async fn decompose_scene(
    State(state): State<AppState>,
    body: Result<Json<DecomposeSceneRequest>, JsonRejection>,
) -> ApiResult<Json<DecompositionSummary>> {
    let Json(request) = body?;
    let wps = request
        .words_per_second
        .unwrap_or(state.default_words_per_second);

    match state
        .pipeline
        .decomposer
        .decompose(&state.scene, &request.story_text, wps)
        .await
    {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => Err(report_failure(&state, "decompose", e).await),
    }
}

/// POST /scene/run
///
/// Decompose, generate every cue and (unless `auto_mix` is false) mix.
pub async fn run_scene(
    State(state): State<AppState>,
    body: Result<Json<RunSceneRequest>, JsonRejection>,
) -> ApiResult<Json<PipelineReport>> {
    let Json(request) = body?;
    let wps = request
        .words_per_second
        .unwrap_or(state.default_words_per_second);

    tracing::info!(
        words = request.story_text.split_whitespace().count(),
        auto_mix = request.auto_mix,
        "Scene pipeline requested"
    );

    match state
        .pipeline
        .run_story(&state.scene, &request.story_text, wps, request.auto_mix)
        .await
    {
        Ok(report) => {
            if let Some(error) = &report.mix_error {
                state.record_error(format!("mix: {}", error)).await;
            }
            Ok(Json(report))
        }
        Err(e) => Err(report_failure(&state, &e.step.to_string(), e.source).await),
    }
}

/// GET /scene
pub async fn get_scene(State(state): State<AppState>) -> ApiResult<Json<SceneSummary>> {
    let guard = state.scene.read().await;
    let scene = guard.as_ref().ok_or(SceneError::NoScene)?;
    Ok(Json(scene.summary()))
}

/// POST /scene/generate
///
/// Batch-generate every `Pending` cue.
pub async fn generate_pending(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<BatchSummary>> {
    let Json(request) = body?;

    match state
        .pipeline
        .dispatcher
        .dispatch_pending(&state.scene, request.total_duration_ms)
        .await
    {
        Ok(summary) => {
            if let Some(error) = &summary.transport_error {
                state.record_error(format!("generate: {}", error)).await;
            }
            Ok(Json(summary))
        }
        Err(e) => Err(report_failure(&state, "generate", e).await),
    }
}

/// POST /scene/mix
///
/// Mix all `Ready` cues into a new master artifact.
pub async fn mix_scene(State(state): State<AppState>) -> ApiResult<Json<MasterArtifact>> {
    match state.pipeline.mixer.mix(&state.scene).await {
        Ok(artifact) => Ok(Json(artifact)),
        Err(e) => Err(report_failure(&state, "mix", e).await),
    }
}

/// GET /scene/master
pub async fn get_master(State(state): State<AppState>) -> ApiResult<Json<MasterArtifact>> {
    let guard = state.scene.read().await;
    let scene = guard.as_ref().ok_or(SceneError::NoScene)?;
    let master = scene.master.clone().ok_or(SceneError::NoMaster)?;
    Ok(Json(master))
}

/// POST /scene/master/metrics
pub async fn master_metrics(State(state): State<AppState>) -> ApiResult<Json<AutomatedMetrics>> {
    match state.evaluations.automated_metrics(&state.scene).await {
        Ok(metrics) => Ok(Json(metrics)),
        Err(e) => Err(report_failure(&state, "metrics", e).await),
    }
}

/// Build scene workflow routes
pub fn scene_routes() -> Router<AppState> {
    Router::new()
        .route("/scene", get(get_scene))
        .route("/scene/decompose", post(decompose_scene))
        .route("/scene/run", post(run_scene))
        .route("/scene/generate", post(generate_pending))
        .route("/scene/mix", post(mix_scene))
        .route("/scene/master", get(get_master))
        .route("/scene/master/metrics", post(master_metrics))
}
