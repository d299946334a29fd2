//! HTTP API handlers for bgm-scene
//!
//! REST endpoints for the scene workflow plus an SSE stream of scene events.

pub mod cues;
pub mod evaluation;
pub mod health;
pub mod scene;
pub mod sse;

pub use cues::cue_routes;
pub use evaluation::evaluation_routes;
pub use health::health_routes;
pub use scene::scene_routes;
pub use sse::scene_event_stream;
