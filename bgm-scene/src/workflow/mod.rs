//! End-to-end scene workflow

pub mod pipeline;

pub use pipeline::{MasterSummary, PipelineError, PipelineReport, PipelineStep, ScenePipeline};
