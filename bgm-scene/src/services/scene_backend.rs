//! Collaborator contract
//!
//! Wire types and the [`SceneBackend`] trait for the external decomposition,
//! generation, mix and evaluation service, plus the best-effort
//! [`RecordSink`] for evaluation records. Audio crosses this boundary as
//! base64 text.

use crate::models::{
    AutomatedMetrics, Cue, CueContent, CueKind, HumanScores, MixParams, ParamError,
};
use async_trait::async_trait;
use bgm_common::events::EvaluationTarget;
use bgm_common::FadeCurve;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Duration assumed when the decomposition omits one
pub const DEFAULT_CUE_DURATION_MS: u64 = 2000;

/// Collaborator call errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Backend returned no audio")]
    MissingAudio,
}

// ============================================================================
// Wire cue
// ============================================================================

/// One cue as exchanged with the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCue {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub audio_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrator_description: Option<String>,
    #[serde(default)]
    pub start_time_ms: u64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_db: Option<f32>,
    /// Legacy symmetric fade; seeds both fades when the split ones are absent
    #[serde(default, skip_serializing)]
    pub fade_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in_curve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out_curve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_y: Option<f32>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

fn parse_curve(raw: Option<&str>, cue_id: &str) -> FadeCurve {
    match raw {
        None => FadeCurve::default(),
        Some(name) => FadeCurve::parse(name).unwrap_or_else(|| {
            warn!(cue_id, curve = name, "Unknown fade curve, using linear");
            FadeCurve::default()
        }),
    }
}

impl WireCue {
    /// Build a fresh `Pending` cue from a decomposition entry
    ///
    /// The collaborator's id is not kept; the new cue gets its own.
    pub fn into_cue(self) -> Result<Cue, ParamError> {
        let kind = CueKind::parse(&self.audio_type).unwrap_or_else(|| {
            warn!(
                cue_id = %self.id,
                audio_type = %self.audio_type,
                "Unknown audio type, treating as SFX"
            );
            CueKind::Sfx
        });
        let duration_ms = if self.duration_ms == 0 {
            DEFAULT_CUE_DURATION_MS
        } else {
            self.duration_ms
        };

        if kind == CueKind::Narrator {
            let story = self.story.or(self.audio_class).unwrap_or_default();
            return Cue::narration(
                story,
                self.narrator_description.unwrap_or_default(),
                self.start_time_ms,
                duration_ms,
            );
        }

        let mut mix = MixParams::from_raw(
            self.weight_db.unwrap_or(0.0),
            self.fade_in_ms
                .or(self.fade_ms)
                .unwrap_or(crate::models::mix_params::DEFAULT_FADE_MS),
            self.fade_out_ms
                .or(self.fade_ms)
                .unwrap_or(crate::models::mix_params::DEFAULT_FADE_MS),
            self.pan_x.unwrap_or(crate::models::mix_params::PAN_CENTER),
            self.pan_y.unwrap_or(crate::models::mix_params::PAN_CENTER),
            duration_ms,
        )?;
        mix.fade_in_curve = parse_curve(self.fade_in_curve.as_deref(), &self.id);
        mix.fade_out_curve = parse_curve(self.fade_out_curve.as_deref(), &self.id);

        let prompt_text = self.audio_class.or(self.story).unwrap_or_default();
        Cue::sound(kind, prompt_text, self.start_time_ms, duration_ms, mix)
    }
}

impl From<&Cue> for WireCue {
    fn from(cue: &Cue) -> Self {
        let mut wire = WireCue {
            id: cue.id().to_string(),
            audio_type: cue.kind().as_str().to_string(),
            audio_class: None,
            story: None,
            narrator_description: None,
            start_time_ms: cue.start_ms(),
            duration_ms: cue.duration_ms(),
            weight_db: None,
            fade_ms: None,
            fade_in_ms: None,
            fade_out_ms: None,
            fade_in_curve: None,
            fade_out_curve: None,
            pan_x: None,
            pan_y: None,
        };

        match cue.content() {
            CueContent::Sound { prompt_text, mix } => {
                wire.audio_class = Some(prompt_text.clone());
                wire.weight_db = Some(mix.gain_db());
                wire.fade_in_ms = Some(mix.fade_in_ms());
                wire.fade_out_ms = Some(mix.fade_out_ms());
                wire.fade_in_curve = Some(mix.fade_in_curve.as_str().to_string());
                wire.fade_out_curve = Some(mix.fade_out_curve.as_str().to_string());
                wire.pan_x = Some(mix.pan_x());
                wire.pan_y = Some(mix.pan_y());
            }
            CueContent::Narration {
                story,
                narrator_description,
            } => {
                wire.story = Some(story.clone());
                wire.narrator_description = Some(narrator_description.clone());
            }
        }
        wire
    }
}

// ============================================================================
// Requests and responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeRequest {
    pub story_text: String,
    pub speed_wps: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeResponse {
    pub cues: Vec<WireCue>,
    #[serde(default)]
    pub total_duration_ms: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGenerationRequest {
    pub cues: Vec<WireCue>,
    pub total_duration_ms: u64,
}

/// One entry of a batch response, matched back to its cue by `audio_cue.id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAudioResult {
    pub audio_cue: WireCue,
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGenerationResponse {
    #[serde(default)]
    pub audio_cues: Vec<WireAudioResult>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerationRequest {
    pub cue: WireCue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegenerationResponse {
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// A Ready cue with its audio, as sent for mixing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixCueEntry {
    pub audio_cue: WireCue,
    pub audio_base64: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixRequest {
    pub story_text: String,
    pub speed_wps: f32,
    pub cues: Vec<MixCueEntry>,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixResponse {
    pub audio_base64: String,
    #[serde(default)]
    pub total_duration_ms: Option<u64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub text: String,
    pub audio_base64: String,
}

/// Evaluation record forwarded to the record sink
#[derive(Debug, Clone, Serialize)]
pub struct RecordSubmission {
    pub session_id: Uuid,
    pub evaluation_id: Uuid,
    pub evaluator: String,
    pub target: EvaluationTarget,
    pub scores: HumanScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    pub source_text: String,
    pub submitted_at: DateTime<Utc>,
}

// ============================================================================
// Traits
// ============================================================================

/// External scene collaborator
///
/// Each method is one request/response round trip; implementations never
/// retry.
#[async_trait]
pub trait SceneBackend: Send + Sync {
    /// Story text to a cue list and a total duration hint
    async fn decompose(&self, request: &DecomposeRequest)
        -> Result<DecomposeResponse, BackendError>;

    /// Audio for many cues in one call; results may come back in any order
    async fn generate_batch(
        &self,
        request: &BatchGenerationRequest,
    ) -> Result<BatchGenerationResponse, BackendError>;

    /// Audio for a single cue
    async fn regenerate(
        &self,
        request: &RegenerationRequest,
    ) -> Result<RegenerationResponse, BackendError>;

    /// Mix Ready cues into one master track
    async fn mix(&self, request: &MixRequest) -> Result<MixResponse, BackendError>;

    /// Objective metrics for a rendered track
    async fn evaluate(&self, request: &EvaluateRequest) -> Result<AutomatedMetrics, BackendError>;

    /// Reachability probe
    async fn health(&self) -> Result<(), BackendError>;
}

/// Best-effort sink for evaluation records; responses are not interpreted
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn submit(&self, record: &RecordSubmission) -> Result<(), BackendError>;
}
