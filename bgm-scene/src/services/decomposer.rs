//! Story decomposition
//!
//! Asks the collaborator to split a story into cues and installs the result
//! as a brand new scene. The previous scene, its cues and its master are
//! discarded; in-flight responses for them become stale.

use super::scene_backend::{DecomposeRequest, SceneBackend};
use crate::error::SceneError;
use crate::models::{ParamError, SceneHandle, SceneState};
use crate::registry::CueRegistry;
use bgm_common::events::{BgmEvent, EventBus};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompositionSummary {
    pub session_id: Uuid,
    pub cue_ids: Vec<Uuid>,
    pub duration_hint_ms: u64,
    /// Entries the collaborator returned that could not become cues
    pub rejected: usize,
}

pub struct SceneDecomposer {
    backend: Arc<dyn SceneBackend>,
    event_bus: EventBus,
}

impl SceneDecomposer {
    pub fn new(backend: Arc<dyn SceneBackend>, event_bus: EventBus) -> Self {
        Self { backend, event_bus }
    }

    /// Decompose `story_text` and replace the current scene
    ///
    /// On failure the current scene is left as it was.
    pub async fn decompose(
        &self,
        scene: &SceneHandle,
        story_text: &str,
        words_per_second: f32,
    ) -> Result<DecompositionSummary, SceneError> {
        if story_text.trim().is_empty() {
            return Err(ParamError::Empty {
                field: "story_text",
            }
            .into());
        }
        if !(words_per_second.is_finite() && words_per_second > 0.0) {
            return Err(ParamError::NotPositive {
                field: "words_per_second",
            }
            .into());
        }

        let request = DecomposeRequest {
            story_text: story_text.to_string(),
            speed_wps: words_per_second,
        };
        let response = self.backend.decompose(&request).await?;

        let returned = response.cues.len();
        let cues: Vec<_> = response
            .cues
            .into_iter()
            .filter_map(|wire| {
                let source_id = wire.id.clone();
                wire.into_cue()
                    .map_err(|e| {
                        warn!(source_id = %source_id, error = %e, "Decomposition entry rejected")
                    })
                    .ok()
            })
            .collect();

        if cues.is_empty() {
            return Err(SceneError::EmptyDecomposition);
        }

        let state = SceneState::new(
            story_text.to_string(),
            words_per_second,
            response.total_duration_ms,
            CueRegistry::from_cues(cues),
        );
        let summary = DecompositionSummary {
            session_id: state.session_id,
            cue_ids: state.registry.ids(),
            duration_hint_ms: state.duration_hint_ms,
            rejected: returned - state.registry.len(),
        };

        *scene.write().await = Some(state);

        info!(
            session_id = %summary.session_id,
            cues = summary.cue_ids.len(),
            rejected = summary.rejected,
            duration_hint_ms = summary.duration_hint_ms,
            "Scene decomposed"
        );
        self.event_bus.emit_lossy(BgmEvent::SceneDecomposed {
            session_id: summary.session_id,
            cue_count: summary.cue_ids.len(),
            total_duration_ms: summary.duration_hint_ms,
            timestamp: Utc::now(),
        });

        Ok(summary)
    }
}
