//! Mix parameter model
//!
//! Canonical units: gain in dB (clamped to [-20, +6]), fades in whole
//! milliseconds, pan as normalized [0, 1] coordinates (0.5, 0.5 is centre).
//! Edit surfaces that work in timeline fractions convert at the edge via
//! [`FadeLength`]; everything downstream (generation and mix requests) reads
//! the canonical values unchanged.

use bgm_common::FadeCurve;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GAIN_DB_MIN: f32 = -20.0;
pub const GAIN_DB_MAX: f32 = 6.0;

pub const DEFAULT_FADE_MS: u64 = 500;
pub const PAN_CENTER: f32 = 0.5;

/// Rejected parameter edit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("fade fraction {0} outside [0, 1]")]
    FractionOutOfRange(f32),

    #[error("{field} of {fade_ms}ms exceeds cue duration {duration_ms}ms")]
    FadeExceedsDuration {
        field: &'static str,
        fade_ms: u64,
        duration_ms: u64,
    },

    #[error("duration must be greater than zero")]
    ZeroDuration,

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} cannot be set on a {kind} cue")]
    WrongCueKind { field: &'static str, kind: String },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Per-cue mixing parameters (sound cues only; narration is mixed flat)
///
/// Serialize-only: values enter through the clamping setters, `from_raw`
/// or a [`super::CuePatch`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixParams {
    gain_db: f32,
    fade_in_ms: u64,
    fade_out_ms: u64,
    pub fade_in_curve: FadeCurve,
    pub fade_out_curve: FadeCurve,
    pan_x: f32,
    pan_y: f32,
}

impl Default for MixParams {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            fade_in_ms: DEFAULT_FADE_MS,
            fade_out_ms: DEFAULT_FADE_MS,
            fade_in_curve: FadeCurve::Linear,
            fade_out_curve: FadeCurve::Linear,
            pan_x: PAN_CENTER,
            pan_y: PAN_CENTER,
        }
    }
}

impl MixParams {
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn fade_in_ms(&self) -> u64 {
        self.fade_in_ms
    }

    pub fn fade_out_ms(&self) -> u64 {
        self.fade_out_ms
    }

    pub fn pan_x(&self) -> f32 {
        self.pan_x
    }

    pub fn pan_y(&self) -> f32 {
        self.pan_y
    }

    /// Set gain, clamped to [`GAIN_DB_MIN`, `GAIN_DB_MAX`]
    pub fn set_gain_db(&mut self, gain_db: f32) -> Result<f32, ParamError> {
        self.gain_db = clamp_gain_db(gain_db)?;
        Ok(self.gain_db)
    }

    /// Set both pan coordinates, each clamped to [0, 1]
    pub fn set_pan(&mut self, pan_x: f32, pan_y: f32) -> Result<(), ParamError> {
        self.pan_x = clamp_unit("pan_x", pan_x)?;
        self.pan_y = clamp_unit("pan_y", pan_y)?;
        Ok(())
    }

    pub fn set_fade_in(&mut self, fade: FadeLength, duration_ms: u64) -> Result<u64, ParamError> {
        self.fade_in_ms = fade.resolve("fade_in", duration_ms)?;
        Ok(self.fade_in_ms)
    }

    pub fn set_fade_out(&mut self, fade: FadeLength, duration_ms: u64) -> Result<u64, ParamError> {
        self.fade_out_ms = fade.resolve("fade_out", duration_ms)?;
        Ok(self.fade_out_ms)
    }

    /// Fade-in as a fraction of `duration_ms`
    pub fn fade_in_fraction(&self, duration_ms: u64) -> f32 {
        millis_to_fraction(self.fade_in_ms, duration_ms)
    }

    /// Fade-out as a fraction of `duration_ms`
    pub fn fade_out_fraction(&self, duration_ms: u64) -> f32 {
        millis_to_fraction(self.fade_out_ms, duration_ms)
    }

    /// Shorten fades that no longer fit after the cue duration changed
    pub(crate) fn fit_to_duration(&mut self, duration_ms: u64) {
        self.fade_in_ms = self.fade_in_ms.min(duration_ms);
        self.fade_out_ms = self.fade_out_ms.min(duration_ms);
    }

    /// Linear gain multiplier at `offset_ms` into a cue of `duration_ms`
    ///
    /// Fade-in and fade-out envelopes multiply where they overlap.
    pub fn envelope_at(&self, offset_ms: u64, duration_ms: u64) -> f32 {
        if offset_ms > duration_ms {
            return 0.0;
        }
        let level = db_to_linear(self.gain_db);

        let fade_in = if self.fade_in_ms > 0 && offset_ms < self.fade_in_ms {
            self.fade_in_curve
                .calculate_fade_in(offset_ms as f32 / self.fade_in_ms as f32)
        } else {
            1.0
        };

        let remaining = duration_ms - offset_ms;
        let fade_out = if self.fade_out_ms > 0 && remaining < self.fade_out_ms {
            self.fade_out_curve
                .calculate_fade_out(1.0 - remaining as f32 / self.fade_out_ms as f32)
        } else {
            1.0
        };

        level * fade_in * fade_out
    }

    /// Build from raw (untrusted) values, clamping and fitting to duration
    pub fn from_raw(
        gain_db: f32,
        fade_in_ms: u64,
        fade_out_ms: u64,
        pan_x: f32,
        pan_y: f32,
        duration_ms: u64,
    ) -> Result<Self, ParamError> {
        let mut params = Self {
            gain_db: clamp_gain_db(gain_db)?,
            fade_in_ms,
            fade_out_ms,
            ..Self::default()
        };
        params.set_pan(pan_x, pan_y)?;
        params.fit_to_duration(duration_ms);
        Ok(params)
    }
}

/// Fade length as entered on an edit surface
///
/// JSON: `{"millis": 750}` or `{"fraction": 0.1}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeLength {
    /// Absolute milliseconds (canonical)
    Millis(u64),
    /// Fraction of the cue's duration, in [0, 1]
    Fraction(f32),
}

impl FadeLength {
    /// Convert to canonical milliseconds for a cue of `duration_ms`
    pub fn resolve(self, field: &'static str, duration_ms: u64) -> Result<u64, ParamError> {
        let fade_ms = match self {
            FadeLength::Millis(ms) => ms,
            FadeLength::Fraction(fraction) => {
                if !fraction.is_finite() {
                    return Err(ParamError::NotFinite { field });
                }
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(ParamError::FractionOutOfRange(fraction));
                }
                (f64::from(fraction) * duration_ms as f64).round() as u64
            }
        };

        if fade_ms > duration_ms {
            return Err(ParamError::FadeExceedsDuration {
                field,
                fade_ms,
                duration_ms,
            });
        }
        Ok(fade_ms)
    }
}

fn millis_to_fraction(fade_ms: u64, duration_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 0.0;
    }
    (fade_ms as f64 / duration_ms as f64) as f32
}

fn clamp_gain_db(gain_db: f32) -> Result<f32, ParamError> {
    if !gain_db.is_finite() {
        return Err(ParamError::NotFinite { field: "gain_db" });
    }
    Ok(gain_db.clamp(GAIN_DB_MIN, GAIN_DB_MAX))
}

fn clamp_unit(field: &'static str, value: f32) -> Result<f32, ParamError> {
    if !value.is_finite() {
        return Err(ParamError::NotFinite { field });
    }
    Ok(value.clamp(0.0, 1.0))
}

/// dB to linear amplitude
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
