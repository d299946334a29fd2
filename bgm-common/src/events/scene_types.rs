//! Scene-related type definitions
//!
//! Supporting types for cue lifecycle and evaluation targets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-cue lifecycle state
///
/// Pending → Generating → Ready | Failed, and
/// Ready → Regenerating → Ready | Failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum CueState {
    /// Created by decomposition, no request sent yet
    Pending,
    /// Generation request in flight, no audio yet
    Generating,
    /// Audio attached
    Ready,
    /// Replacement audio requested, previous audio still attached
    Regenerating,
    /// Last request errored or returned no audio
    Failed,
}

impl CueState {
    /// Whether a cue in this state owns an audio payload
    pub fn has_payload(&self) -> bool {
        matches!(self, CueState::Ready | CueState::Regenerating)
    }

    /// Whether a request for this cue is currently in flight
    pub fn is_in_flight(&self) -> bool {
        matches!(self, CueState::Generating | CueState::Regenerating)
    }
}

impl std::fmt::Display for CueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CueState::Pending => write!(f, "Pending"),
            CueState::Generating => write!(f, "Generating"),
            CueState::Ready => write!(f, "Ready"),
            CueState::Regenerating => write!(f, "Regenerating"),
            CueState::Failed => write!(f, "Failed"),
        }
    }
}

/// What an evaluation record was submitted against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationTarget {
    /// The scene's master artifact
    Master { artifact_id: Uuid },
    /// A single cue
    Cue { cue_id: Uuid },
}
