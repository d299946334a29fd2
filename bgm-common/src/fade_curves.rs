//! Fade curve shapes for cue fade-in and fade-out
//!
//! The mixing backend applies the fades; these formulas describe the
//! shape it is asked for and drive the envelope preview served to the
//! timeline UI.
//!
//! Curves:
//! - Linear: v(t) = t
//! - Exponential: v(t) = t²
//! - Logarithmic: v(t) = √t (fade-in), (1-t)² (fade-out)
//! - SCurve: v(t) = 0.5 × (1 - cos(π × t))
//! - EqualPower: v(t) = sin(t × π/2)

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Fade curve attached to one edge of a cue
///
/// Serialized in snake_case (`"s_curve"`). The timeline editor's
/// `"sigmoid"` and the older `"cosine"` spelling are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Constant rate of change
    #[default]
    Linear,

    /// Slow start, fast finish
    Exponential,

    /// Fast start, slow finish
    Logarithmic,

    /// Smooth acceleration and deceleration
    #[serde(alias = "sigmoid", alias = "cosine", alias = "scurve")]
    SCurve,

    /// Constant perceived loudness
    #[serde(alias = "equalpower")]
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at normalized `position` (0.0 start, 1.0 end)
    ///
    /// Returns 0.0 (silence) at the start and 1.0 (full volume) at the end.
    pub fn calculate_fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at normalized `position` (0.0 start, 1.0 end)
    ///
    /// Returns 1.0 at the start of the fade-out and 0.0 at the end.
    pub fn calculate_fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential => 1.0 - t * t,
            FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// Parse a curve name, case-insensitive, accepting editor aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Some(FadeCurve::Linear),
            "exponential" | "exp" => Some(FadeCurve::Exponential),
            "logarithmic" | "log" => Some(FadeCurve::Logarithmic),
            "sigmoid" | "cosine" | "scurve" | "s-curve" | "s_curve" => Some(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            _ => None,
        }
    }

    /// Canonical wire name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::Exponential => "Exponential",
            FadeCurve::Logarithmic => "Logarithmic",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        }
    }

    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_in_bounds() {
        for curve in FadeCurve::all_variants() {
            let start_val = curve.calculate_fade_in(0.0);
            let end_val = curve.calculate_fade_in(1.0);
            assert!(
                start_val.abs() < 0.01,
                "{:?} fade-in at 0.0 should be ~0.0, got {}",
                curve,
                start_val
            );
            assert!(
                (end_val - 1.0).abs() < 0.01,
                "{:?} fade-in at 1.0 should be ~1.0, got {}",
                curve,
                end_val
            );
        }
    }

    #[test]
    fn test_fade_out_bounds() {
        for curve in FadeCurve::all_variants() {
            let start_val = curve.calculate_fade_out(0.0);
            let end_val = curve.calculate_fade_out(1.0);
            assert!(
                (start_val - 1.0).abs() < 0.01,
                "{:?} fade-out at 0.0 should be ~1.0, got {}",
                curve,
                start_val
            );
            assert!(
                end_val.abs() < 0.01,
                "{:?} fade-out at 1.0 should be ~0.0, got {}",
                curve,
                end_val
            );
        }
    }

    #[test]
    fn test_fade_in_monotonic() {
        for curve in FadeCurve::all_variants() {
            let mut prev = curve.calculate_fade_in(0.0);
            for step in 1..=20 {
                let v = curve.calculate_fade_in(step as f32 / 20.0);
                assert!(v + 1e-6 >= prev, "{:?} fade-in decreased at step {}", curve, step);
                prev = v;
            }
        }
    }

    #[test]
    fn test_position_is_clamped() {
        assert_eq!(FadeCurve::Linear.calculate_fade_in(-0.5), 0.0);
        assert_eq!(FadeCurve::Linear.calculate_fade_in(1.5), 1.0);
        assert_eq!(FadeCurve::Linear.calculate_fade_out(2.0), 0.0);
    }

    #[test]
    fn test_name_round_trip() {
        for curve in FadeCurve::all_variants() {
            assert_eq!(FadeCurve::parse(curve.as_str()), Some(*curve));
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(FadeCurve::parse("sigmoid"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::parse("cosine"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::parse("s-curve"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::parse("Log"), Some(FadeCurve::Logarithmic));
        assert_eq!(FadeCurve::parse("EXPONENTIAL"), Some(FadeCurve::Exponential));
        assert_eq!(FadeCurve::parse("invalid"), None);
        assert_eq!(FadeCurve::parse(""), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FadeCurve::SCurve).unwrap();
        assert_eq!(json, "\"s_curve\"");

        let parsed: FadeCurve = serde_json::from_str("\"sigmoid\"").unwrap();
        assert_eq!(parsed, FadeCurve::SCurve);

        let parsed: FadeCurve = serde_json::from_str("\"equal_power\"").unwrap();
        assert_eq!(parsed, FadeCurve::EqualPower);
    }

    #[test]
    fn test_default_is_linear() {
        assert_eq!(FadeCurve::default(), FadeCurve::Linear);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FadeCurve::SCurve), "S-Curve");
        assert_eq!(format!("{}", FadeCurve::EqualPower), "Equal Power");
    }
}
