//! Analysis engine: change windows and version decisions

pub mod change_analyzer;
pub mod version_decider;

pub use change_analyzer::{ChangeAnalyzer, ReleaseTag};
pub use version_decider::VersionDecider;
