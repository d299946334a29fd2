//! Evaluation session
//!
//! Records reviewer scores against the master artifact or a single cue and
//! forwards each record to the optional record sink. Forwarding runs on its
//! own task; its outcome is only logged and never reaches the caller.
//! Evaluations never modify audio.

use super::scene_backend::{EvaluateRequest, RecordSink, RecordSubmission, SceneBackend};
use crate::error::SceneError;
use crate::models::{AutomatedMetrics, EvaluationRecord, EvaluationSubmission, SceneHandle};
use bgm_common::events::{BgmEvent, EvaluationTarget, EventBus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct EvaluationService {
    backend: Arc<dyn SceneBackend>,
    record_sink: Option<Arc<dyn RecordSink>>,
    event_bus: EventBus,
}

impl EvaluationService {
    pub fn new(
        backend: Arc<dyn SceneBackend>,
        record_sink: Option<Arc<dyn RecordSink>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            backend,
            record_sink,
            event_bus,
        }
    }

    /// Validate and store an evaluation, then forward it
    pub async fn submit(
        &self,
        scene: &SceneHandle,
        submission: EvaluationSubmission,
    ) -> Result<EvaluationRecord, SceneError> {
        submission.validate()?;

        let (record, forward) = {
            let mut guard = scene.write().await;
            let state = guard.as_mut().ok_or(SceneError::NoScene)?;

            let audio_base64 = match submission.target {
                EvaluationTarget::Master { artifact_id } => {
                    let master = state.master.as_ref().ok_or(SceneError::NoMaster)?;
                    if master.artifact_id != artifact_id {
                        return Err(SceneError::ArtifactNotFound(artifact_id));
                    }
                    Some(master.payload.to_base64())
                }
                EvaluationTarget::Cue { cue_id } => {
                    let scores = submission.scores;
                    state
                        .registry
                        .update_with(cue_id, |cue| {
                            cue.set_evaluation(scores);
                            cue.payload().map(|p| p.to_base64())
                        })
                        .ok_or(SceneError::CueNotFound(cue_id))?
                }
            };

            let record = EvaluationRecord::new(state.session_id, submission);
            state.evaluations.push(record.clone());

            let forward = RecordSubmission {
                session_id: record.session_id,
                evaluation_id: record.evaluation_id,
                evaluator: record.evaluator.clone(),
                target: record.target,
                scores: record.scores,
                feedback: record.comment.clone(),
                audio_base64,
                source_text: state.story_text.clone(),
                submitted_at: record.submitted_at,
            };
            (record, forward)
        };

        info!(
            session_id = %record.session_id,
            evaluation_id = %record.evaluation_id,
            evaluator = %record.evaluator,
            mean_score = record.scores.mean(),
            "Evaluation recorded"
        );
        self.event_bus.emit_lossy(BgmEvent::EvaluationSubmitted {
            session_id: record.session_id,
            evaluation_id: record.evaluation_id,
            target: record.target,
            timestamp: Utc::now(),
        });

        self.forward(forward);
        Ok(record)
    }

    fn forward(&self, submission: RecordSubmission) {
        let Some(sink) = self.record_sink.clone() else {
            debug!(evaluation_id = %submission.evaluation_id, "No record sink configured");
            return;
        };
        tokio::spawn(async move {
            match sink.submit(&submission).await {
                Ok(()) => debug!(evaluation_id = %submission.evaluation_id, "Evaluation forwarded"),
                Err(e) => warn!(
                    evaluation_id = %submission.evaluation_id,
                    error = %e,
                    "Failed to forward evaluation record"
                ),
            }
        });
    }

    /// Evaluations recorded for the current scene, oldest first
    pub async fn list(&self, scene: &SceneHandle) -> Result<Vec<EvaluationRecord>, SceneError> {
        let guard = scene.read().await;
        let state = guard.as_ref().ok_or(SceneError::NoScene)?;
        Ok(state.evaluations.clone())
    }

    /// Objective metrics for the current master artifact
    pub async fn automated_metrics(
        &self,
        scene: &SceneHandle,
    ) -> Result<AutomatedMetrics, SceneError> {
        let request = {
            let guard = scene.read().await;
            let state = guard.as_ref().ok_or(SceneError::NoScene)?;
            let master = state.master.as_ref().ok_or(SceneError::NoMaster)?;
            EvaluateRequest {
                text: state.story_text.clone(),
                audio_base64: master.payload.to_base64(),
            }
        };

        let metrics = self.backend.evaluate(&request).await?;
        info!(
            clap_score = metrics.clap_score,
            spectral_richness = metrics.spectral_richness,
            noise_floor = metrics.noise_floor,
            onsets = metrics.audio_onsets.len(),
            "Automated metrics computed"
        );
        Ok(metrics)
    }
}
