//! Data models for scene orchestration

pub mod cue;
pub mod evaluation;
pub mod master;
pub mod mix_params;
pub mod payload;
pub mod scene;

pub use cue::{
    ApplyOutcome, Cue, CueContent, CueKind, CuePatch, GenerationOutcome, LifecycleError,
    RequestTicket, Transition,
};
pub use evaluation::{
    AutomatedMetrics, EvaluationError, EvaluationRecord, EvaluationSubmission, HumanScores,
};
pub use master::MasterArtifact;
pub use mix_params::{FadeLength, MixParams, ParamError};
pub use payload::AudioPayload;
pub use scene::{new_scene_handle, SceneHandle, SceneState, SceneSummary, StateCounts};
