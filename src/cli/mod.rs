//! CLI-facing orchestration of a release run

pub mod orchestration;

pub use orchestration::{report_setup_failure, PipelineOptions, ReleasePipeline};
