use crate::boundary::BoundaryWarning;
use crate::config::ReleaseConfig;
use crate::domain::{
    NewRelease, PublishedAsset, ReleaseNotes, TagPattern, TagRecord, TagState, VersionDecision,
};
use crate::error::Result;
use crate::git::{Repository, TagCreation};
use crate::hosting::ReleaseHost;
use git2::Oid;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a publish run did, transition by transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub tag: String,
    /// State the tag was found in before any mutation
    pub observed: TagState,
    /// State reached at the end of the run
    pub state: TagState,
    pub tag_created: bool,
    pub tag_pushed: bool,
    pub release_created: bool,
    pub assets_uploaded: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The decision did not call for a release
    Skipped { reason: String },
    Published(PublishReport),
}

/// Drives a release tag through NOT_TAGGED -> TAGGED_LOCAL -> TAGGED_REMOTE -> RELEASED
///
/// Every transition is create-or-skip: re-running against the same target is
/// safe and converges on one tag and one release.
pub struct Publisher<'a> {
    repo: &'a dyn Repository,
    host: &'a dyn ReleaseHost,
    remote: &'a str,
    pattern: &'a TagPattern,
    release: &'a ReleaseConfig,
    root: PathBuf,
    dry_run: bool,
}

impl<'a> Publisher<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        host: &'a dyn ReleaseHost,
        remote: &'a str,
        pattern: &'a TagPattern,
        release: &'a ReleaseConfig,
    ) -> Self {
        let root = repo.workdir().unwrap_or_else(|| PathBuf::from("."));
        Publisher {
            repo,
            host,
            remote,
            pattern,
            release,
            root,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Directory artifact paths are resolved against
    pub fn artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Check tag existence at both scopes
    pub fn observe(
        &self,
        tag: &str,
        target: Oid,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<TagRecord> {
        let local = self.repo.find_tag_oid(tag)?;
        let remote = self.repo.remote_tag_oid(self.remote, tag)?;

        if let Some(actual) = local {
            self.check_target(tag, target, actual, warnings);
        }
        if let Some(actual) = remote.filter(|oid| Some(*oid) != local) {
            self.check_target(tag, target, actual, warnings);
        }

        Ok(TagRecord {
            name: tag.to_string(),
            target: target.to_string(),
            local: local.is_some(),
            remote: remote.is_some(),
        })
    }

    /// Whether an existing tag has reached the remote with its release and every
    /// artifact present on disk attached
    ///
    /// A run that failed between pushing and uploading leaves this false, and the
    /// next run completes the release instead of declaring nothing to do.
    pub fn is_complete(&self, tag: &str) -> Result<bool> {
        if !self.repo.remote_has_tag(self.remote, tag)? {
            return Ok(false);
        }
        let Some(release) = self.host.find_release(tag)? else {
            return Ok(false);
        };
        let missing = self
            .release
            .artifacts
            .iter()
            .filter_map(|artifact| Self::asset(&self.root.join(artifact)))
            .any(|asset| !release.assets.contains(&asset.name));
        Ok(!missing)
    }

    pub fn publish(
        &self,
        decision: &VersionDecision,
        notes: &ReleaseNotes,
        target: Oid,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<PublishOutcome> {
        if !decision.should_release() {
            return Ok(PublishOutcome::Skipped {
                reason: decision.rationale().to_string(),
            });
        }

        let version = decision.next_version();
        let tag = self.pattern.format(&version);
        let title = self.release.title(&tag, &version);

        let record = self.observe(&tag, target, warnings)?;
        let observed = record.state();
        info!(tag = %tag, state = %observed, "tag state observed");

        let mut report = PublishReport {
            tag: tag.clone(),
            observed,
            state: observed,
            tag_created: false,
            tag_pushed: false,
            release_created: false,
            assets_uploaded: Vec::new(),
            dry_run: self.dry_run,
        };

        if self.dry_run {
            info!(tag = %tag, state = %observed, "dry run: no tag, push or release performed");
            return Ok(PublishOutcome::Published(report));
        }

        if observed == TagState::NotTagged {
            match self.repo.create_annotated_tag(&tag, target, &title)? {
                TagCreation::Created => {
                    info!(tag = %tag, target = %target, "tag created locally");
                    report.tag_created = true;
                }
                TagCreation::AlreadyExists => {
                    info!(tag = %tag, "tag appeared locally before creation, reusing it");
                    if let Some(actual) = self.repo.find_tag_oid(&tag)? {
                        self.check_target(&tag, target, actual, warnings);
                    }
                }
            }
            report.state = TagState::TaggedLocal;
        }

        if report.state == TagState::TaggedLocal {
            report.tag_pushed = self.push_tag(&tag)?;
            report.state = TagState::TaggedRemote;
        }

        let release = match self.host.find_release(&tag)? {
            Some(existing) => {
                info!(tag = %tag, id = existing.id, "release already exists");
                existing
            }
            None => {
                let created = self.host.create_release(&NewRelease {
                    tag_name: tag.clone(),
                    title,
                    notes: notes.body().to_string(),
                    latest: self.release.mark_latest,
                })?;
                report.release_created = true;
                created
            }
        };

        for artifact in &self.release.artifacts {
            let path = self.root.join(artifact);
            let Some(asset) = Self::asset(&path) else {
                let warning = BoundaryWarning::MissingArtifact {
                    path: artifact.display().to_string(),
                };
                warning.emit();
                warnings.push(warning);
                continue;
            };
            self.host.upload_asset(&release, &asset)?;
            report.assets_uploaded.push(asset.name);
        }

        report.state = TagState::Released;
        info!(tag = %tag, release = release.id, "release published");
        Ok(PublishOutcome::Published(report))
    }

    /// Push the tag; losing a push race to another run counts as success
    fn push_tag(&self, tag: &str) -> Result<bool> {
        match self.repo.push_tags(self.remote, &[tag]) {
            Ok(()) => {
                info!(tag = %tag, remote = %self.remote, "tag pushed");
                Ok(true)
            }
            Err(e) => {
                if self.repo.remote_has_tag(self.remote, tag).unwrap_or(false) {
                    warn!(tag = %tag, error = %e, "push failed but tag is present on remote; continuing");
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn check_target(
        &self,
        tag: &str,
        expected: Oid,
        actual: Oid,
        warnings: &mut Vec<BoundaryWarning>,
    ) {
        if actual != expected {
            let warning = BoundaryWarning::TagTargetMismatch {
                tag: tag.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            };
            warning.emit();
            warnings.push(warning);
        }
    }

    fn asset(path: &Path) -> Option<PublishedAsset> {
        if path.is_file() {
            PublishedAsset::from_path(path)
        } else {
            None
        }
    }
}
