//! Cue data entity
//!
//! One timeline element: what to generate, where it sits on the master
//! timeline, how it is mixed, and which lifecycle state it is in.
//!
//! Invariant: the audio payload is present exactly when the state is
//! `Ready` or `Regenerating`. State and payload are private to this module
//! and its `lifecycle` child, so no other code can break it.

use super::evaluation::HumanScores;
use super::mix_params::{FadeLength, MixParams, ParamError};
use super::payload::AudioPayload;
use bgm_common::events::CueState;
use bgm_common::FadeCurve;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod lifecycle;

pub use lifecycle::{ApplyOutcome, GenerationOutcome, LifecycleError, RequestTicket, Transition};

/// Cue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CueKind {
    Sfx,
    Ambience,
    Music,
    Narrator,
}

impl CueKind {
    /// Parse a collaborator `audio_type`, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SFX" => Some(CueKind::Sfx),
            "AMBIENCE" => Some(CueKind::Ambience),
            "MUSIC" => Some(CueKind::Music),
            "NARRATOR" => Some(CueKind::Narrator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::Sfx => "SFX",
            CueKind::Ambience => "AMBIENCE",
            CueKind::Music => "MUSIC",
            CueKind::Narrator => "NARRATOR",
        }
    }
}

impl std::fmt::Display for CueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific cue content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CueContent {
    /// SFX, ambience or music: prompt plus mixing parameters
    Sound { prompt_text: String, mix: MixParams },
    /// Narrated passage of the story
    Narration {
        story: String,
        narrator_description: String,
    },
}

/// Partial update applied by [`crate::registry::CueRegistry::update`]
///
/// Absent fields are left unchanged. The whole patch is validated before
/// anything is written, so a rejected patch leaves the cue untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CuePatch {
    pub prompt_text: Option<String>,
    pub story: Option<String>,
    pub narrator_description: Option<String>,
    pub start_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub gain_db: Option<f32>,
    pub fade_in: Option<FadeLength>,
    pub fade_out: Option<FadeLength>,
    pub fade_in_curve: Option<FadeCurve>,
    pub fade_out_curve: Option<FadeCurve>,
    pub pan_x: Option<f32>,
    pub pan_y: Option<f32>,
}

impl CuePatch {
    fn touches_mix(&self) -> Option<&'static str> {
        if self.prompt_text.is_some() {
            Some("prompt_text")
        } else if self.gain_db.is_some() {
            Some("gain_db")
        } else if self.fade_in.is_some() {
            Some("fade_in")
        } else if self.fade_out.is_some() {
            Some("fade_out")
        } else if self.fade_in_curve.is_some() {
            Some("fade_in_curve")
        } else if self.fade_out_curve.is_some() {
            Some("fade_out_curve")
        } else if self.pan_x.is_some() {
            Some("pan_x")
        } else if self.pan_y.is_some() {
            Some("pan_y")
        } else {
            None
        }
    }

    fn touches_narration(&self) -> Option<&'static str> {
        if self.story.is_some() {
            Some("story")
        } else if self.narrator_description.is_some() {
            Some("narrator_description")
        } else {
            None
        }
    }
}

/// One timeline element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    id: Uuid,
    kind: CueKind,
    #[serde(flatten)]
    content: CueContent,
    start_ms: u64,
    duration_ms: u64,
    state: CueState,
    #[serde(rename = "audio_base64", skip_serializing_if = "Option::is_none")]
    payload: Option<AudioPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<HumanScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(skip)]
    request_seq: u64,
}

impl Cue {
    /// New SFX/ambience/music cue in `Pending` state
    pub fn sound(
        kind: CueKind,
        prompt_text: impl Into<String>,
        start_ms: u64,
        duration_ms: u64,
        mix: MixParams,
    ) -> Result<Self, ParamError> {
        if kind == CueKind::Narrator {
            return Err(ParamError::WrongCueKind {
                field: "prompt_text",
                kind: kind.to_string(),
            });
        }
        let prompt_text = non_empty("prompt_text", prompt_text.into())?;
        if duration_ms == 0 {
            return Err(ParamError::ZeroDuration);
        }
        let mut mix = mix;
        mix.fit_to_duration(duration_ms);

        Ok(Self::pending(
            kind,
            CueContent::Sound { prompt_text, mix },
            start_ms,
            duration_ms,
        ))
    }

    /// New narrator cue in `Pending` state
    pub fn narration(
        story: impl Into<String>,
        narrator_description: impl Into<String>,
        start_ms: u64,
        duration_ms: u64,
    ) -> Result<Self, ParamError> {
        let story = non_empty("story", story.into())?;
        if duration_ms == 0 {
            return Err(ParamError::ZeroDuration);
        }

        Ok(Self::pending(
            CueKind::Narrator,
            CueContent::Narration {
                story,
                narrator_description: narrator_description.into(),
            },
            start_ms,
            duration_ms,
        ))
    }

    fn pending(kind: CueKind, content: CueContent, start_ms: u64, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content,
            start_ms,
            duration_ms,
            state: CueState::Pending,
            payload: None,
            evaluation: None,
            last_error: None,
            request_seq: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> CueKind {
        self.kind
    }

    pub fn content(&self) -> &CueContent {
        &self.content
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// End of the cue on the master timeline
    pub fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    pub fn state(&self) -> CueState {
        self.state
    }

    pub fn payload(&self) -> Option<&AudioPayload> {
        self.payload.as_ref()
    }

    pub fn evaluation(&self) -> Option<&HumanScores> {
        self.evaluation.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Mixing parameters; `None` for narrator cues
    pub fn mix(&self) -> Option<&MixParams> {
        match &self.content {
            CueContent::Sound { mix, .. } => Some(mix),
            CueContent::Narration { .. } => None,
        }
    }

    /// Prompt for sound cues, story text for narrator cues
    pub fn generation_text(&self) -> &str {
        match &self.content {
            CueContent::Sound { prompt_text, .. } => prompt_text,
            CueContent::Narration { story, .. } => story,
        }
    }

    pub(crate) fn set_evaluation(&mut self, scores: HumanScores) {
        self.evaluation = Some(scores);
    }

    /// Merge `patch` into this cue
    ///
    /// Edits never look at lifecycle state: they apply immediately and are
    /// picked up by the next generation or mix request.
    pub fn apply_patch(&mut self, patch: &CuePatch) -> Result<(), ParamError> {
        let mut content = self.content.clone();
        let mut start_ms = self.start_ms;
        let mut duration_ms = self.duration_ms;

        if let Some(start) = patch.start_ms {
            start_ms = start;
        }
        if let Some(duration) = patch.duration_ms {
            if duration == 0 {
                return Err(ParamError::ZeroDuration);
            }
            duration_ms = duration;
        }

        match &mut content {
            CueContent::Sound { prompt_text, mix } => {
                if let Some(field) = patch.touches_narration() {
                    return Err(ParamError::WrongCueKind {
                        field,
                        kind: self.kind.to_string(),
                    });
                }
                if let Some(text) = &patch.prompt_text {
                    *prompt_text = non_empty("prompt_text", text.clone())?;
                }
                mix.fit_to_duration(duration_ms);
                if let Some(gain_db) = patch.gain_db {
                    mix.set_gain_db(gain_db)?;
                }
                if patch.pan_x.is_some() || patch.pan_y.is_some() {
                    let pan_x = patch.pan_x.unwrap_or(mix.pan_x());
                    let pan_y = patch.pan_y.unwrap_or(mix.pan_y());
                    mix.set_pan(pan_x, pan_y)?;
                }
                if let Some(fade) = patch.fade_in {
                    mix.set_fade_in(fade, duration_ms)?;
                }
                if let Some(fade) = patch.fade_out {
                    mix.set_fade_out(fade, duration_ms)?;
                }
                if let Some(curve) = patch.fade_in_curve {
                    mix.fade_in_curve = curve;
                }
                if let Some(curve) = patch.fade_out_curve {
                    mix.fade_out_curve = curve;
                }
            }
            CueContent::Narration {
                story,
                narrator_description,
            } => {
                if let Some(field) = patch.touches_mix() {
                    return Err(ParamError::WrongCueKind {
                        field,
                        kind: self.kind.to_string(),
                    });
                }
                if let Some(text) = &patch.story {
                    *story = non_empty("story", text.clone())?;
                }
                if let Some(description) = &patch.narrator_description {
                    *narrator_description = description.clone();
                }
            }
        }

        self.content = content;
        self.start_ms = start_ms;
        self.duration_ms = duration_ms;
        Ok(())
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ParamError> {
    if value.trim().is_empty() {
        return Err(ParamError::Empty { field });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rain() -> Cue {
        Cue::sound(CueKind::Ambience, "heavy rain", 0, 8000, MixParams::default()).unwrap()
    }

    #[test]
    fn test_new_cue_is_pending_without_payload() {
        let cue = rain();
        assert_eq!(cue.state(), CueState::Pending);
        assert!(cue.payload().is_none());
        assert_eq!(cue.end_ms(), 8000);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(rain().id(), rain().id());
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(CueKind::parse("sfx"), Some(CueKind::Sfx));
        assert_eq!(CueKind::parse(" Ambience "), Some(CueKind::Ambience));
        assert_eq!(CueKind::parse("NARRATOR"), Some(CueKind::Narrator));
        assert_eq!(CueKind::parse("Dialogue"), None);
    }

    #[test]
    fn test_sound_cue_rejects_narrator_kind() {
        let result = Cue::sound(CueKind::Narrator, "x", 0, 100, MixParams::default());
        assert!(matches!(result, Err(ParamError::WrongCueKind { .. })));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let result = Cue::sound(CueKind::Sfx, "door slam", 0, 0, MixParams::default());
        assert_eq!(result, Err(ParamError::ZeroDuration));
        assert_eq!(Cue::narration("Once", "calm", 0, 0), Err(ParamError::ZeroDuration));
    }

    #[test]
    fn test_patch_updates_mix_fields() {
        let mut cue = rain();
        cue.apply_patch(&CuePatch {
            gain_db: Some(-4.5),
            fade_in: Some(FadeLength::Fraction(0.1)),
            fade_out_curve: Some(FadeCurve::EqualPower),
            pan_x: Some(0.2),
            ..Default::default()
        })
        .unwrap();

        let mix = cue.mix().unwrap();
        assert_eq!(mix.gain_db(), -4.5);
        assert_eq!(mix.fade_in_ms(), 800);
        assert_eq!(mix.fade_out_curve, FadeCurve::EqualPower);
        assert_eq!(mix.pan_x(), 0.2);
        assert_eq!(mix.pan_y(), 0.5);
    }

    #[test]
    fn test_rejected_patch_leaves_cue_untouched() {
        let mut cue = rain();
        let before = cue.clone();
        let result = cue.apply_patch(&CuePatch {
            gain_db: Some(-2.0),
            fade_in: Some(FadeLength::Millis(9000)),
            ..Default::default()
        });

        assert!(result.is_err());
        assert_eq!(cue, before);
    }

    #[test]
    fn test_narrator_rejects_mix_fields() {
        let mut cue = Cue::narration("The door creaked open.", "low, gravelly", 0, 3000).unwrap();
        let result = cue.apply_patch(&CuePatch {
            gain_db: Some(2.0),
            ..Default::default()
        });
        assert_eq!(
            result,
            Err(ParamError::WrongCueKind {
                field: "gain_db",
                kind: "NARRATOR".to_string()
            })
        );
    }

    #[test]
    fn test_sound_rejects_story() {
        let mut cue = rain();
        let result = cue.apply_patch(&CuePatch {
            story: Some("text".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(ParamError::WrongCueKind { field: "story", .. })));
    }

    #[test]
    fn test_shortening_duration_fits_fades() {
        let mut cue = Cue::sound(
            CueKind::Music,
            "tense strings",
            0,
            10_000,
            MixParams::from_raw(0.0, 3000, 3000, 0.5, 0.5, 10_000).unwrap(),
        )
        .unwrap();

        cue.apply_patch(&CuePatch {
            duration_ms: Some(2000),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(cue.duration_ms(), 2000);
        assert_eq!(cue.mix().unwrap().fade_in_ms(), 2000);
        assert_eq!(cue.mix().unwrap().fade_out_ms(), 2000);
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let mut cue = rain();
        let result = cue.apply_patch(&CuePatch {
            prompt_text: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(result, Err(ParamError::Empty { field: "prompt_text" }));
    }

    #[test]
    fn test_unknown_patch_field_rejected() {
        let result: Result<CuePatch, _> = serde_json::from_str(r#"{"volume": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let cue = rain();
        let json = serde_json::to_value(&cue).unwrap();
        assert_eq!(json["kind"], "AMBIENCE");
        assert_eq!(json["prompt_text"], "heavy rain");
        assert_eq!(json["state"], "Pending");
        assert_eq!(json["mix"]["fade_in_ms"], 500);
        assert!(json.get("audio_base64").is_none());
    }
}
