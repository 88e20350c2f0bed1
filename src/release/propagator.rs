use crate::boundary::BoundaryWarning;
use crate::config::VersionFileConfig;
use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// The file already carries the version
    Unchanged,
    PatternNotFound,
    Committed { commit: String, pushed: bool },
}

/// Writes the released version back into a tracked file and commits it
pub struct Propagator<'a> {
    repo: &'a dyn Repository,
    config: &'a VersionFileConfig,
    remote: &'a str,
    branch: &'a str,
    root: PathBuf,
}

impl<'a> Propagator<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        config: &'a VersionFileConfig,
        remote: &'a str,
        branch: &'a str,
    ) -> Self {
        let root = repo.workdir().unwrap_or_else(|| PathBuf::from("."));
        Propagator {
            repo,
            config,
            remote,
            branch,
            root,
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Replace the first capture group of the configured pattern in `path`
    ///
    /// `path` is relative to the repository root. Nothing is written or
    /// committed unless the content actually changes.
    pub fn propagate(
        &self,
        next_version: &Version,
        path: &Path,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<PropagationOutcome> {
        let pattern = Regex::new(&self.config.pattern)
            .map_err(|e| ReleaseError::config(format!("Invalid version_file.pattern: {}", e)))?;

        let full_path = self.root.join(path);
        let content = fs::read_to_string(&full_path)?;

        let Some(found) = pattern.captures(&content).and_then(|caps| caps.get(1)) else {
            let warning = BoundaryWarning::VersionPatternNotFound {
                path: path.display().to_string(),
            };
            warning.emit();
            warnings.push(warning);
            return Ok(PropagationOutcome::PatternNotFound);
        };

        let new_version = next_version.to_string();
        if found.as_str() == new_version {
            info!(path = %path.display(), version = %new_version, "version file already up to date");
            return Ok(PropagationOutcome::Unchanged);
        }

        let mut updated = String::with_capacity(content.len());
        updated.push_str(&content[..found.start()]);
        updated.push_str(&new_version);
        updated.push_str(&content[found.end()..]);
        fs::write(&full_path, updated)?;

        let message = self.config.commit_message.replace("{version}", &new_version);
        let commit = self.repo.commit_paths(&[path], &message)?;
        info!(path = %path.display(), commit = %commit, "version file committed");

        if self.config.push {
            self.repo.push_branch(self.remote, self.branch)?;
            info!(branch = %self.branch, remote = %self.remote, "version commit pushed");
        }

        Ok(PropagationOutcome::Committed {
            commit: commit.to_string(),
            pushed: self.config.push,
        })
    }
}
