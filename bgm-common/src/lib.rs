//! # BGM Common Library
//!
//! Shared code for the BackGroundMellow scene services:
//! - Error type
//! - Event types (BgmEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Fade curve definitions and calculations

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
