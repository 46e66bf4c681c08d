pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{equalize, run_pipeline, run_pipeline_reported};
pub use types::{EqualizationOutput, NoOpReporter, PipelineOutput, PipelineStage, ProgressReporter};
