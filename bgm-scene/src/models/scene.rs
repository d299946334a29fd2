//! Scene session state
//!
//! A scene is created by a decomposition and lives until the next one
//! replaces it. Everything long-running captures the `session_id` before
//! awaiting a collaborator and re-checks it before writing back.

use super::evaluation::EvaluationRecord;
use super::master::MasterArtifact;
use crate::registry::CueRegistry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared handle to the current scene (`None` before the first decomposition)
pub type SceneHandle = Arc<RwLock<Option<SceneState>>>;

pub fn new_scene_handle() -> SceneHandle {
    Arc::new(RwLock::new(None))
}

#[derive(Debug, Clone)]
pub struct SceneState {
    pub session_id: Uuid,
    pub story_text: String,
    pub words_per_second: f32,
    /// Total duration reported by the decomposition collaborator
    pub duration_hint_ms: u64,
    pub registry: CueRegistry,
    pub master: Option<MasterArtifact>,
    pub evaluations: Vec<EvaluationRecord>,
    pub created_at: DateTime<Utc>,
}

impl SceneState {
    pub fn new(
        story_text: String,
        words_per_second: f32,
        duration_hint_ms: u64,
        registry: CueRegistry,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            story_text,
            words_per_second,
            duration_hint_ms,
            registry,
            master: None,
            evaluations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> SceneSummary {
        let mut counts = StateCounts::default();
        for cue in self.registry.list() {
            counts.record(cue.state());
        }
        SceneSummary {
            session_id: self.session_id,
            story_text: self.story_text.clone(),
            words_per_second: self.words_per_second,
            duration_hint_ms: self.duration_hint_ms,
            cue_count: self.registry.len(),
            states: counts,
            master_artifact_id: self.master.as_ref().map(|m| m.artifact_id),
            evaluation_count: self.evaluations.len(),
            created_at: self.created_at,
        }
    }
}

/// Cue counts per lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub pending: usize,
    pub generating: usize,
    pub ready: usize,
    pub regenerating: usize,
    pub failed: usize,
}

impl StateCounts {
    fn record(&mut self, state: bgm_common::events::CueState) {
        use bgm_common::events::CueState::*;
        match state {
            Pending => self.pending += 1,
            Generating => self.generating += 1,
            Ready => self.ready += 1,
            Regenerating => self.regenerating += 1,
            Failed => self.failed += 1,
        }
    }
}

/// Scene overview returned by `GET /scene`
#[derive(Debug, Clone, Serialize)]
pub struct SceneSummary {
    pub session_id: Uuid,
    pub story_text: String,
    pub words_per_second: f32,
    pub duration_hint_ms: u64,
    pub cue_count: usize,
    pub states: StateCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_artifact_id: Option<Uuid>,
    pub evaluation_count: usize,
    pub created_at: DateTime<Utc>,
}
