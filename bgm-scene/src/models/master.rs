//! Master mix artifact

use super::payload::AudioPayload;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Result of a successful mix
///
/// Replaced wholesale by the next successful mix; a failed mix leaves the
/// previous artifact in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterArtifact {
    pub artifact_id: Uuid,
    #[serde(rename = "audio_base64")]
    pub payload: AudioPayload,
    pub total_duration_ms: u64,
    /// Cues that were Ready when the mix request was built, in timeline order
    pub cue_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl MasterArtifact {
    pub fn new(payload: AudioPayload, total_duration_ms: u64, cue_ids: Vec<Uuid>) -> Self {
        Self {
            artifact_id: Uuid::new_v4(),
            payload,
            total_duration_ms,
            cue_ids,
            created_at: Utc::now(),
        }
    }
}
