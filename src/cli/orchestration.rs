//! Pipeline coordination
//!
//! Runs the gate stages, then the release stage, then notification. The
//! coordinator owns no git or HTTP logic of its own; it wires the components
//! together and turns their results into a [RunReport].

use crate::analyzer::{ChangeAnalyzer, ReleaseTag, VersionDecider};
use crate::boundary::BoundaryWarning;
use crate::config::{Config, Secrets};
use crate::domain::{
    BranchContext, ChangeSet, DecisionSource, ReleaseNotes, TagState, Version, VersionDecision,
};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::hosting::ReleaseHost;
use crate::notify::{self, NotificationSink};
use crate::reasoning::ReasoningService;
use crate::release::{NoteComposer, PropagationOutcome, Propagator, PublishOutcome, Publisher};
use crate::report::{RunOutcome, RunReport};
use crate::stages::{self, StageKind, StageRunner, StageStatus};
use git2::Oid;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Switches that come from the command line rather than the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Observe and decide, but never tag, push, release or commit
    pub dry_run: bool,
    /// Treat every gate stage as skipped
    pub skip_stages: bool,
}

/// Collaborators of one pipeline run
pub struct ReleasePipeline<'a> {
    pub config: &'a Config,
    pub secrets: &'a Secrets,
    pub repo: &'a dyn Repository,
    pub host: &'a dyn ReleaseHost,
    pub reasoning: &'a dyn ReasoningService,
    pub stages: &'a dyn StageRunner,
    pub sink: &'a dyn NotificationSink,
    pub options: PipelineOptions,
}

/// A release-stage step that failed
struct StageFailure {
    stage: &'static str,
    error: String,
}

impl StageFailure {
    fn at(stage: &'static str) -> impl Fn(ReleaseError) -> StageFailure {
        move |e| StageFailure {
            stage,
            error: e.to_string(),
        }
    }
}

/// A version ready to be published at a commit
struct Candidate {
    decision: VersionDecision,
    notes: ReleaseNotes,
    target: Oid,
}

/// Report and notify a run that could not assemble its collaborators
///
/// The sink is the only collaborator needed, so setup failures still reach
/// the notification channel.
pub fn report_setup_failure(
    sink: &dyn NotificationSink,
    error: impl fmt::Display,
    options: PipelineOptions,
) -> RunReport {
    let mut report = RunReport::new(RunOutcome::Failed {
        stage: "setup".to_string(),
        error: error.to_string(),
    });
    report.dry_run = options.dry_run;
    warn!(error = %error, "run finished: setup failed");

    if let Some(warning) = notify::notify(sink, &report) {
        report.warnings.push(warning.to_string());
    }
    report
}

impl<'a> ReleasePipeline<'a> {
    /// Run the whole pipeline once; never panics and always notifies
    pub fn run(&self) -> RunReport {
        let mut warnings = Vec::new();
        let mut report = RunReport::new(RunOutcome::NoRelease {
            reason: String::new(),
        });
        report.dry_run = self.options.dry_run;
        report.coverage_report = self.config.stages.coverage_report.clone();

        let outcome = self.execute(&mut report, &mut warnings);
        report.outcome = outcome;

        match &report.outcome {
            RunOutcome::Released { tag, .. } => info!(tag = %tag, "run finished: released"),
            RunOutcome::NoRelease { reason } => info!(%reason, "run finished: no release"),
            RunOutcome::Failed { stage, error } => warn!(%stage, %error, "run finished: failed"),
        }

        report.warnings = warnings.iter().map(ToString::to_string).collect();
        if let Some(warning) = notify::notify(self.sink, &report) {
            report.warnings.push(warning.to_string());
        }
        report
    }

    fn execute(&self, report: &mut RunReport, warnings: &mut Vec<BoundaryWarning>) -> RunOutcome {
        let branch = match self.repo.current_branch() {
            Ok(branch) => BranchContext::new(branch, &self.config.repository.trunk),
            Err(e) => {
                return RunOutcome::Failed {
                    stage: "setup".to_string(),
                    error: e.to_string(),
                }
            }
        };
        let head = self.repo.head_oid().ok().map(|oid| oid.to_string());

        report.stages = self.run_gate(branch.name.as_deref(), head.as_deref());
        if let Some((kind, StageStatus::Failed(reason))) = report
            .stages
            .iter()
            .find(|(_, status)| !status.permits_release())
        {
            return RunOutcome::Failed {
                stage: kind.to_string(),
                error: reason.clone(),
            };
        }

        if !branch.is_trunk() {
            return RunOutcome::NoRelease {
                reason: format!(
                    "Branch '{}' is not the trunk '{}'; releases are cut from the trunk only",
                    branch.display_name(),
                    branch.trunk
                ),
            };
        }

        match self.release(&branch, report, warnings) {
            Ok(outcome) => outcome,
            Err(failure) => RunOutcome::Failed {
                stage: failure.stage.to_string(),
                error: failure.error,
            },
        }
    }

    fn run_gate(
        &self,
        branch: Option<&str>,
        head: Option<&str>,
    ) -> BTreeMap<StageKind, StageStatus> {
        if self.options.skip_stages {
            info!("gate stages skipped on request");
            return StageKind::ALL
                .into_iter()
                .map(|kind| (kind, StageStatus::Skipped))
                .collect();
        }
        stages::run_gate(self.stages, &self.config.stages, branch, head)
    }

    fn release(
        &self,
        branch: &BranchContext,
        report: &mut RunReport,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> std::result::Result<RunOutcome, StageFailure> {
        let repo_config = &self.config.repository;
        let setup = StageFailure::at("release");

        self.config
            .validate_for_release(self.secrets, self.options.dry_run)
            .map_err(&setup)?;
        let pattern = repo_config.tag_pattern().map_err(&setup)?;
        let baseline = repo_config.baseline().map_err(&setup)?;

        ChangeAnalyzer::ensure_full_history(self.repo).map_err(StageFailure::at("analyze"))?;
        if let Err(e) = self.repo.fetch_tags(&repo_config.remote) {
            let warning = BoundaryWarning::FetchFailed {
                remote: repo_config.remote.clone(),
                reason: e.to_string(),
            };
            warning.emit();
            warnings.push(warning);
        }

        let analyzer = ChangeAnalyzer::new(&pattern);
        let (latest, change_set) = self
            .analyze(&analyzer, warnings)
            .map_err(StageFailure::at("analyze"))?;

        let publisher = Publisher::new(
            self.repo,
            self.host,
            &repo_config.remote,
            &pattern,
            &self.config.release,
        )
        .artifact_root(self.root())
        .dry_run(self.options.dry_run);

        if change_set.is_empty() {
            if let Some(tag) = &latest {
                if let Some(candidate) =
                    self.resume(&analyzer, &publisher, tag, baseline, warnings)?
                {
                    report.decision = Some(candidate.decision.clone());
                    return self.publish(branch, &publisher, candidate, report, warnings);
                }
                let warning = BoundaryWarning::NoNewCommits {
                    latest_tag: tag.name.clone(),
                    current_commit_hash: change_set.head.clone(),
                };
                warning.emit();
                warnings.push(warning);
            }
            return Ok(RunOutcome::NoRelease {
                reason: "No commits since the last release".to_string(),
            });
        }

        let current = latest.as_ref().map_or(baseline, |tag| tag.version);
        let decision = VersionDecider::new(&self.config.conventional_commits, self.reasoning)
            .decide(&change_set, current, warnings);
        report.decision = Some(decision.clone());

        if !decision.should_release() {
            return Ok(RunOutcome::NoRelease {
                reason: decision.rationale().to_string(),
            });
        }

        let notes = NoteComposer::new(self.reasoning).compose(&decision, &change_set, warnings);
        let target = self.repo.head_oid().map_err(StageFailure::at("publish"))?;
        let candidate = Candidate {
            decision,
            notes,
            target,
        };
        self.publish(branch, &publisher, candidate, report, warnings)
    }

    /// Prepare to finish the release of a tag at HEAD that an earlier run left
    /// incomplete; `None` when the tag is fully published
    fn resume(
        &self,
        analyzer: &ChangeAnalyzer<'_>,
        publisher: &Publisher<'_>,
        tag: &ReleaseTag,
        baseline: Version,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> std::result::Result<Option<Candidate>, StageFailure> {
        if publisher
            .is_complete(&tag.name)
            .map_err(StageFailure::at("publish"))?
        {
            return Ok(None);
        }
        info!(tag = %tag.name, "tag at HEAD is not fully published, completing it");

        let analyze = StageFailure::at("analyze");
        let previous = analyzer
            .previous_release_tag(self.repo, tag)
            .map_err(&analyze)?;
        let target = self
            .repo
            .find_tag_oid(&tag.name)
            .map_err(&analyze)?
            .ok_or_else(|| analyze(ReleaseError::tag(format!("Tag '{}' vanished", tag.name))))?;
        let change_set = analyzer
            .window(self.repo, previous.as_ref().map(|t| t.name.as_str()), target)
            .map_err(&analyze)?;

        let decision = VersionDecision::for_existing(
            previous.as_ref().map_or(baseline, |t| t.version),
            tag.version,
            format!("Completing the release of existing tag {}", tag.name),
            DecisionSource::Heuristic,
        );
        if !decision.should_release() {
            return Ok(None);
        }

        let notes = NoteComposer::new(self.reasoning).compose(&decision, &change_set, warnings);
        Ok(Some(Candidate {
            decision,
            notes,
            target,
        }))
    }

    fn publish(
        &self,
        branch: &BranchContext,
        publisher: &Publisher<'_>,
        candidate: Candidate,
        report: &mut RunReport,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> std::result::Result<RunOutcome, StageFailure> {
        let Candidate {
            decision,
            notes,
            target,
        } = candidate;
        let published = match publisher
            .publish(&decision, &notes, target, warnings)
            .map_err(StageFailure::at("publish"))?
        {
            PublishOutcome::Skipped { reason } => return Ok(RunOutcome::NoRelease { reason }),
            PublishOutcome::Published(published) => published,
        };
        report.tag_state = Some(published.state.to_string());

        if published.dry_run {
            return Ok(RunOutcome::NoRelease {
                reason: format!(
                    "Dry run: would publish {} (currently {})",
                    published.tag, published.observed
                ),
            });
        }

        if published.state == TagState::Released {
            self.propagate(branch, &decision.next_version(), warnings)
                .map_err(StageFailure::at("propagate"))?;
        }

        Ok(RunOutcome::Released {
            tag: published.tag,
            version: decision.next_version().to_string(),
        })
    }

    fn analyze(
        &self,
        analyzer: &ChangeAnalyzer<'_>,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<(Option<ReleaseTag>, ChangeSet)> {
        let latest = analyzer.latest_release_tag(self.repo, warnings)?;
        let change_set = analyzer.analyze(self.repo, latest.as_ref().map(|t| t.name.as_str()))?;
        Ok((latest, change_set))
    }

    fn propagate(
        &self,
        branch: &BranchContext,
        version: &Version,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<()> {
        let Some(path) = self.config.version_file.path.as_deref() else {
            return Ok(());
        };
        if !branch.is_trunk() {
            return Ok(());
        }

        let outcome = Propagator::new(
            self.repo,
            &self.config.version_file,
            &self.config.repository.remote,
            &branch.trunk,
        )
        .root(self.root())
        .propagate(version, path, warnings)?;

        if let PropagationOutcome::Committed { commit, pushed } = outcome {
            info!(%commit, pushed, "version string propagated");
        }
        Ok(())
    }

    fn root(&self) -> PathBuf {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.config.repository.path.clone())
    }
}
