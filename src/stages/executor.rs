use crate::error::{ReleaseError, Result};
use crate::stages::{StageContext, StageRunner};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Runs stage commands through `sh -c` in the repository directory
pub struct CommandStageRunner {
    dir: PathBuf,
}

impl CommandStageRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CommandStageRunner { dir: dir.into() }
    }
}

impl StageRunner for CommandStageRunner {
    /// The command succeeds only with exit code 0
    fn run(&self, command: &str, context: &StageContext) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(ReleaseError::Stage(format!(
                "Stage directory not found: {}",
                self.dir.display()
            )));
        }

        debug!(stage = %context.kind, command, "running stage command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.dir)
            .envs(context.to_env_vars())
            .output()
            .map_err(|e| {
                ReleaseError::Stage(format!("Failed to execute {} stage: {}", context.kind, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ReleaseError::Stage(format!(
                "{} stage failed with exit code {}\nStdout: {}\nStderr: {}",
                context.kind,
                output.status.code().unwrap_or(-1),
                stdout.trim(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}
