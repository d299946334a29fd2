//! Scene pipeline
//!
//! Drives the full story flow in one call:
//! - **Decompose**: story text to a fresh scene of `Pending` cues
//! - **Generate**: one batched generation call for every `Pending` cue
//! - **Mix**: optional master mix of whatever came back `Ready`
//!
//! # Error Handling
//! - Decomposition failure leaves the previous scene untouched
//! - Per-cue generation failures are counted, not raised
//! - Mix failure keeps the generated cues and is reported alongside them

use crate::error::SceneError;
use crate::models::{MasterArtifact, SceneHandle};
use crate::services::{
    BatchSummary, DecompositionSummary, GenerationDispatcher, MixOrchestrator, SceneDecomposer,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Decompose,
    Generate,
    Mix,
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStep::Decompose => write!(f, "decompose"),
            PipelineStep::Generate => write!(f, "generate"),
            PipelineStep::Mix => write!(f, "mix"),
        }
    }
}

/// A step that stopped the pipeline
#[derive(Debug, Clone, Error)]
#[error("{step} step failed: {source}")]
pub struct PipelineError {
    pub step: PipelineStep,
    #[source]
    pub source: SceneError,
}

/// Master artifact without its audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterSummary {
    pub artifact_id: Uuid,
    pub total_duration_ms: u64,
    pub cue_ids: Vec<Uuid>,
}

impl From<&MasterArtifact> for MasterSummary {
    fn from(artifact: &MasterArtifact) -> Self {
        Self {
            artifact_id: artifact.artifact_id,
            total_duration_ms: artifact.total_duration_ms,
            cue_ids: artifact.cue_ids.clone(),
        }
    }
}

/// What a pipeline run reached
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub decomposition: DecompositionSummary,
    pub generation: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<MasterSummary>,
    /// Set when auto-mix was requested and failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix_error: Option<String>,
}

pub struct ScenePipeline {
    pub decomposer: SceneDecomposer,
    pub dispatcher: GenerationDispatcher,
    pub mixer: MixOrchestrator,
}

impl ScenePipeline {
    pub fn new(
        decomposer: SceneDecomposer,
        dispatcher: GenerationDispatcher,
        mixer: MixOrchestrator,
    ) -> Self {
        Self {
            decomposer,
            dispatcher,
            mixer,
        }
    }

    /// Decompose, generate and optionally mix `story_text`
    pub async fn run_story(
        &self,
        scene: &SceneHandle,
        story_text: &str,
        words_per_second: f32,
        auto_mix: bool,
    ) -> Result<PipelineReport, PipelineError> {
        let decomposition = self
            .decomposer
            .decompose(scene, story_text, words_per_second)
            .await
            .map_err(|source| PipelineError {
                step: PipelineStep::Decompose,
                source,
            })?;

        let generation = self
            .dispatcher
            .dispatch_pending(scene, None)
            .await
            .map_err(|source| PipelineError {
                step: PipelineStep::Generate,
                source,
            })?;

        let mut report = PipelineReport {
            decomposition,
            generation,
            master: None,
            mix_error: None,
        };

        if auto_mix {
            match self.mixer.mix(scene).await {
                Ok(artifact) => report.master = Some(MasterSummary::from(&artifact)),
                Err(e) => {
                    warn!(error = %e, "Pipeline mix step failed");
                    report.mix_error = Some(e.to_string());
                }
            }
        }

        info!(
            session_id = %report.decomposition.session_id,
            ready = report.generation.ready,
            failed = report.generation.failed,
            mixed = report.master.is_some(),
            "Scene pipeline finished"
        );
        Ok(report)
    }
}
