//! Evaluation records
//!
//! Human scores are submitted against the master artifact or a single cue
//! and are immutable once recorded. Automated metrics come from the
//! evaluation collaborator and are returned to the caller, never stored.

use bgm_common::events::EvaluationTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("evaluator name is required")]
    BlankEvaluator,

    #[error("{field} score {value} outside 1..=5")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("{field} score not set")]
    ScoreUnset { field: &'static str },
}

/// Human rating on three axes, each 1 to 5 (0 means not yet rated)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanScores {
    #[serde(default)]
    pub dramatization: u8,
    #[serde(default)]
    pub sync_accuracy: u8,
    #[serde(default)]
    pub atmospheric_depth: u8,
}

impl HumanScores {
    /// All three axes set and in range
    pub fn validate(&self) -> Result<(), EvaluationError> {
        for (field, value) in [
            ("dramatization", self.dramatization),
            ("sync_accuracy", self.sync_accuracy),
            ("atmospheric_depth", self.atmospheric_depth),
        ] {
            if value == 0 {
                return Err(EvaluationError::ScoreUnset { field });
            }
            if value > SCORE_MAX {
                return Err(EvaluationError::ScoreOutOfRange { field, value });
            }
        }
        Ok(())
    }

    pub fn mean(&self) -> f32 {
        f32::from(self.dramatization + self.sync_accuracy + self.atmospheric_depth) / 3.0
    }
}

/// Request body for a new evaluation
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSubmission {
    pub evaluator: String,
    pub target: EvaluationTarget,
    pub scores: HumanScores,
    #[serde(default)]
    pub comment: Option<String>,
}

impl EvaluationSubmission {
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.evaluator.trim().is_empty() {
            return Err(EvaluationError::BlankEvaluator);
        }
        self.scores.validate()
    }
}

/// Stored evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub evaluation_id: Uuid,
    pub session_id: Uuid,
    pub evaluator: String,
    pub target: EvaluationTarget,
    pub scores: HumanScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl EvaluationRecord {
    pub fn new(session_id: Uuid, submission: EvaluationSubmission) -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            session_id,
            evaluator: submission.evaluator.trim().to_string(),
            target: submission.target,
            scores: submission.scores,
            comment: submission.comment.filter(|c| !c.trim().is_empty()),
            submitted_at: Utc::now(),
        }
    }
}

/// Objective audio metrics computed by the evaluation collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedMetrics {
    /// Text/audio similarity
    pub clap_score: f64,
    pub spectral_richness: f64,
    /// dB
    pub noise_floor: f64,
    /// Onset times in seconds
    #[serde(default)]
    pub audio_onsets: Vec<f64>,
}
