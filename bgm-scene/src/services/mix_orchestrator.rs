//! Mix Orchestrator
//!
//! Builds one mix request from the cues that are `Ready` at the moment the
//! request is built and turns a successful response into the scene's
//! master artifact. Cues still pending, in flight or failed are left out.

use super::scene_backend::{MixCueEntry, MixRequest, SceneBackend, WireCue};
use crate::error::SceneError;
use crate::models::{AudioPayload, Cue, MasterArtifact, SceneHandle, SceneState};
use bgm_common::events::{BgmEvent, EventBus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Timeline length covered by `cues`: latest end time, 0 for none
pub fn mix_total_duration_ms<'a>(cues: impl IntoIterator<Item = &'a Cue>) -> u64 {
    cues.into_iter().map(Cue::end_ms).max().unwrap_or(0)
}

/// Snapshot the Ready cues of `scene` into a mix request
///
/// Returns the request and the ids it covers, in registry order.
pub fn build_mix_request(scene: &SceneState) -> (MixRequest, Vec<Uuid>) {
    let ready: Vec<&Cue> = scene.registry.ready().collect();
    let total_duration_ms = mix_total_duration_ms(ready.iter().copied());

    let mut cue_ids = Vec::with_capacity(ready.len());
    let cues = ready
        .iter()
        .filter_map(|cue| {
            let payload = cue.payload()?;
            cue_ids.push(cue.id());
            Some(MixCueEntry {
                audio_cue: WireCue::from(*cue),
                audio_base64: payload.to_base64(),
                duration_ms: cue.duration_ms(),
            })
        })
        .collect();

    (
        MixRequest {
            story_text: scene.story_text.clone(),
            speed_wps: scene.words_per_second,
            cues,
            total_duration_ms,
        },
        cue_ids,
    )
}

pub struct MixOrchestrator {
    backend: Arc<dyn SceneBackend>,
    event_bus: EventBus,
}

impl MixOrchestrator {
    pub fn new(backend: Arc<dyn SceneBackend>, event_bus: EventBus) -> Self {
        Self { backend, event_bus }
    }

    /// Mix the current Ready-set into a new master artifact
    ///
    /// On success the previous artifact is replaced. On failure it is left
    /// untouched and the error is returned.
    pub async fn mix(&self, scene: &SceneHandle) -> Result<MasterArtifact, SceneError> {
        let (session_id, request, cue_ids) = {
            let guard = scene.read().await;
            let state = guard.as_ref().ok_or(SceneError::NoScene)?;
            let (request, cue_ids) = build_mix_request(state);
            (state.session_id, request, cue_ids)
        };

        if cue_ids.is_empty() {
            return Err(SceneError::NothingToMix);
        }

        info!(
            session_id = %session_id,
            cues = cue_ids.len(),
            total_duration_ms = request.total_duration_ms,
            "Requesting master mix"
        );

        let artifact = match self.call_backend(&request, cue_ids).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Master mix failed");
                self.event_bus.emit_lossy(BgmEvent::MasterMixFailed {
                    session_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };

        {
            let mut guard = scene.write().await;
            match guard.as_mut() {
                Some(state) if state.session_id == session_id => {
                    state.master = Some(artifact.clone());
                }
                _ => {
                    warn!(session_id = %session_id, "Scene replaced during mix, result dropped");
                    return Err(SceneError::SceneReplaced);
                }
            }
        }

        self.event_bus.emit_lossy(BgmEvent::MasterMixCompleted {
            session_id,
            artifact_id: artifact.artifact_id,
            cue_count: artifact.cue_ids.len(),
            total_duration_ms: artifact.total_duration_ms,
            timestamp: Utc::now(),
        });
        info!(
            session_id = %session_id,
            artifact_id = %artifact.artifact_id,
            bytes = artifact.payload.len(),
            "Master mix stored"
        );
        Ok(artifact)
    }

    async fn call_backend(
        &self,
        request: &MixRequest,
        cue_ids: Vec<Uuid>,
    ) -> Result<MasterArtifact, SceneError> {
        let response = self.backend.mix(request).await?;
        let payload = AudioPayload::from_base64(&response.audio_base64)
            .map_err(|e| super::BackendError::Parse(format!("mix audio: {}", e)))?;
        if payload.is_empty() {
            return Err(super::BackendError::MissingAudio.into());
        }
        Ok(MasterArtifact::new(
            payload,
            request.total_duration_ms,
            cue_ids,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CueKind, MixParams};

    fn cue_at(start_ms: u64, duration_ms: u64) -> Cue {
        Cue::sound(CueKind::Sfx, "knock", start_ms, duration_ms, MixParams::default()).unwrap()
    }

    #[test]
    fn test_total_duration_is_latest_end() {
        let cues = [cue_at(0, 2000), cue_at(1500, 1000)];
        assert_eq!(mix_total_duration_ms(cues.iter()), 2500);
    }

    #[test]
    fn test_total_duration_order_independent() {
        let cues = [cue_at(1500, 1000), cue_at(0, 2000), cue_at(200, 100)];
        assert_eq!(mix_total_duration_ms(cues.iter()), 2500);
        assert_eq!(mix_total_duration_ms(cues.iter().rev()), 2500);
    }

    #[test]
    fn test_total_duration_empty_is_zero() {
        assert_eq!(mix_total_duration_ms(std::iter::empty()), 0);
    }
}
