use crate::domain::VersionDecision;
use crate::stages::{StageKind, StageStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Final result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Released { tag: String, version: String },
    NoRelease { reason: String },
    Failed { stage: String, error: String },
}

impl RunOutcome {
    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Failed { .. } => 1,
            _ => 0,
        }
    }
}

/// Everything the notification sink receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stages: BTreeMap<StageKind, StageStatus>,
    pub outcome: RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<VersionDecision>,
    /// Final tag state, e.g. `RELEASED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_report: Option<PathBuf>,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

impl RunReport {
    pub fn new(outcome: RunOutcome) -> Self {
        RunReport {
            stages: BTreeMap::new(),
            outcome,
            decision: None,
            tag_state: None,
            coverage_report: None,
            warnings: Vec::new(),
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let released = RunOutcome::Released {
            tag: "v1.0.0".to_string(),
            version: "1.0.0".to_string(),
        };
        let none = RunOutcome::NoRelease {
            reason: "nothing new".to_string(),
        };
        let failed = RunOutcome::Failed {
            stage: "release".to_string(),
            error: "push rejected".to_string(),
        };
        assert_eq!(released.exit_code(), 0);
        assert_eq!(none.exit_code(), 0);
        assert_eq!(failed.exit_code(), 1);
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = RunReport::new(RunOutcome::NoRelease {
            reason: "nothing new".to_string(),
        });
        report.stages.insert(StageKind::Build, StageStatus::Passed);
        report.stages.insert(StageKind::Security, StageStatus::Skipped);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["kind"], "no_release");
        assert_eq!(json["stages"]["build"]["status"], "passed");
        assert_eq!(json["stages"]["security"]["status"], "skipped");
        assert!(json.get("decision").is_none());
    }
}
