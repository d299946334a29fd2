//! bgm-scene library interface
//!
//! Cue orchestration for story soundscapes: decomposition into cues,
//! batched generation, per-cue lifecycle, master mixing and evaluation.
//! Exposed as a library so integration tests can drive the router and the
//! services directly.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult, SceneError};

use crate::models::{new_scene_handle, SceneHandle};
use crate::services::{
    EvaluationService, GenerationDispatcher, MixOrchestrator, RecordSink, SceneBackend,
    SceneDecomposer,
};
use crate::workflow::ScenePipeline;
use axum::Router;
use bgm_common::events::EventBus;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Events buffered per SSE subscriber
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Current scene (one per service instance)
    pub scene: SceneHandle,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub pipeline: Arc<ScenePipeline>,
    pub evaluations: Arc<EvaluationService>,
    /// Collaborator, kept for health probes
    pub backend: Arc<dyn SceneBackend>,
    /// Reading speed used when a request does not give one
    pub default_words_per_second: f32,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn SceneBackend>,
        record_sink: Option<Arc<dyn RecordSink>>,
        event_bus: EventBus,
        default_words_per_second: f32,
    ) -> Self {
        let pipeline = ScenePipeline::new(
            SceneDecomposer::new(backend.clone(), event_bus.clone()),
            GenerationDispatcher::new(backend.clone(), event_bus.clone()),
            MixOrchestrator::new(backend.clone(), event_bus.clone()),
        );
        let evaluations = EvaluationService::new(backend.clone(), record_sink, event_bus.clone());

        Self {
            scene: new_scene_handle(),
            event_bus,
            pipeline: Arc::new(pipeline),
            evaluations: Arc::new(evaluations),
            backend,
            default_words_per_second,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember `message` for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::scene_routes())
        .merge(api::cue_routes())
        .merge(api::evaluation_routes())
        .merge(api::health_routes())
        .route("/scene/events", axum::routing::get(api::scene_event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
