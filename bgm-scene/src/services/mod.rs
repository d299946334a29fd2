//! Orchestration services and the collaborator boundary

pub mod decomposer;
pub mod evaluation_recorder;
pub mod generation_dispatcher;
pub mod http_backend;
pub mod mix_orchestrator;
pub mod scene_backend;

pub use decomposer::{DecompositionSummary, SceneDecomposer};
pub use evaluation_recorder::EvaluationService;
pub use generation_dispatcher::{BatchSummary, GenerationDispatcher, RegenerationReport};
pub use http_backend::{HttpRecordSink, HttpSceneBackend};
pub use mix_orchestrator::{build_mix_request, mix_total_duration_ms, MixOrchestrator};
pub use scene_backend::{BackendError, RecordSink, RecordSubmission, SceneBackend, WireCue};
