//! Gate stages that must pass before anything is released
//!
//! - build: build and test suite
//! - lint: static analysis
//! - security: security scan
//!
//! Each stage is an optional shell command. Unconfigured stages are skipped
//! and do not block the gate.

pub mod executor;

pub use executor::CommandStageRunner;

use crate::config::StagesConfig;
use crate::error::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::thread;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Build,
    Lint,
    Security,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Build, StageKind::Lint, StageKind::Security];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Build => "build",
            StageKind::Lint => "lint",
            StageKind::Security => "security",
        }
    }

    fn command<'c>(&self, config: &'c StagesConfig) -> Option<&'c str> {
        match self {
            StageKind::Build => config.build.as_deref(),
            StageKind::Lint => config.lint.as_deref(),
            StageKind::Security => config.security.as_deref(),
        }
        .filter(|c| !c.trim().is_empty())
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum StageStatus {
    Passed,
    Failed(String),
    Skipped,
}

impl StageStatus {
    /// Whether this status lets the release gate open
    pub fn permits_release(&self) -> bool {
        !matches!(self, StageStatus::Failed(_))
    }
}

/// Context exported to stage commands
#[derive(Debug, Clone)]
pub struct StageContext {
    pub kind: StageKind,
    pub branch: Option<String>,
    pub head: Option<String>,
}

impl StageContext {
    /// Maps context fields to GIT_RELEASE_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("GIT_RELEASE_STAGE".to_string(), self.kind.name().to_string());
        if let Some(ref branch) = self.branch {
            env.insert("GIT_RELEASE_BRANCH".to_string(), branch.clone());
        }
        if let Some(ref head) = self.head {
            env.insert("GIT_RELEASE_HEAD".to_string(), head.clone());
        }
        env
    }
}

/// Runs one stage command; `Ok` means the stage passed
pub trait StageRunner: Send + Sync {
    fn run(&self, command: &str, context: &StageContext) -> Result<()>;
}

/// Run every configured stage concurrently and collect their statuses
pub fn run_gate(
    runner: &dyn StageRunner,
    config: &StagesConfig,
    branch: Option<&str>,
    head: Option<&str>,
) -> BTreeMap<StageKind, StageStatus> {
    thread::scope(|scope| {
        let handles: Vec<_> = StageKind::ALL
            .into_iter()
            .map(|kind| {
                let command = kind.command(config);
                let context = StageContext {
                    kind,
                    branch: branch.map(str::to_string),
                    head: head.map(str::to_string),
                };
                let handle = scope.spawn(move || match command {
                    None => StageStatus::Skipped,
                    Some(command) => match runner.run(command, &context) {
                        Ok(()) => StageStatus::Passed,
                        Err(e) => StageStatus::Failed(e.to_string()),
                    },
                });
                (kind, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(kind, handle)| {
                let status = handle
                    .join()
                    .unwrap_or_else(|_| StageStatus::Failed("stage runner panicked".to_string()));
                match &status {
                    StageStatus::Passed => info!(stage = %kind, "stage passed"),
                    StageStatus::Skipped => info!(stage = %kind, "stage not configured, skipped"),
                    StageStatus::Failed(reason) => warn!(stage = %kind, %reason, "stage failed"),
                }
                (kind, status)
            })
            .collect()
    })
}
