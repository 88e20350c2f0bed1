use crate::boundary::BoundaryWarning;
use crate::domain::{ChangeSet, TagPattern, Version};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use git2::Oid;
use tracing::{debug, info};

/// The most recent release tag reachable from HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub name: String,
    pub version: Version,
}

/// Builds the change window between the last published tag and HEAD
pub struct ChangeAnalyzer<'a> {
    pattern: &'a TagPattern,
}

impl<'a> ChangeAnalyzer<'a> {
    pub fn new(pattern: &'a TagPattern) -> Self {
        ChangeAnalyzer { pattern }
    }

    /// Full history is a precondition; a shallow clone is a fatal configuration error
    pub fn ensure_full_history<R: Repository + ?Sized>(repo: &R) -> Result<()> {
        if repo.is_shallow() {
            let path = repo
                .workdir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string());
            return Err(ReleaseError::HistoryUnavailable { path });
        }
        Ok(())
    }

    /// Find the highest-versioned tag that follows the pattern and is an ancestor of HEAD
    ///
    /// Tags that follow the pattern but do not parse are skipped with a warning.
    pub fn latest_release_tag<R: Repository + ?Sized>(
        &self,
        repo: &R,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<Option<ReleaseTag>> {
        let head = repo.head_oid()?;
        self.best_tag(repo, head, None, warnings)
    }

    /// The release that preceded `tag`: the highest lower version reachable from it
    pub fn previous_release_tag<R: Repository + ?Sized>(
        &self,
        repo: &R,
        tag: &ReleaseTag,
    ) -> Result<Option<ReleaseTag>> {
        let target = repo
            .find_tag_oid(&tag.name)?
            .ok_or_else(|| ReleaseError::tag(format!("Tag '{}' not found locally", tag.name)))?;
        // Unparsable tags were already reported by the HEAD scan
        self.best_tag(repo, target, Some(tag.version), &mut Vec::new())
    }

    fn best_tag<R: Repository + ?Sized>(
        &self,
        repo: &R,
        tip: Oid,
        below: Option<Version>,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<Option<ReleaseTag>> {
        let mut best: Option<ReleaseTag> = None;

        for name in repo.list_tags()? {
            let Some(version_text) = self.pattern.extract(&name) else {
                continue;
            };

            let version = match Version::parse(version_text) {
                Ok(version) => version,
                Err(e) => {
                    let warning = BoundaryWarning::UnparsableTag {
                        tag: name.clone(),
                        reason: e.to_string(),
                    };
                    warning.emit();
                    warnings.push(warning);
                    continue;
                }
            };

            if below.is_some_and(|limit| version >= limit) {
                continue;
            }

            let Some(target) = repo.find_tag_oid(&name)? else {
                continue;
            };
            if !repo.is_ancestor(target, tip)? {
                debug!(tag = %name, "tag not reachable from tip, ignoring");
                continue;
            }

            if best.as_ref().map_or(true, |b| version > b.version) {
                best = Some(ReleaseTag { name, version });
            }
        }

        Ok(best)
    }

    /// Collect the commits since `last_tag`, or the whole history when there is none
    pub fn analyze<R: Repository + ?Sized>(
        &self,
        repo: &R,
        last_tag: Option<&str>,
    ) -> Result<ChangeSet> {
        Self::ensure_full_history(repo)?;
        let head = repo.head_oid()?;
        self.window(repo, last_tag, head)
    }

    /// Commits reachable from `tip` but not from `last_tag`
    pub fn window<R: Repository + ?Sized>(
        &self,
        repo: &R,
        last_tag: Option<&str>,
        tip: Oid,
    ) -> Result<ChangeSet> {
        let base = match last_tag {
            Some(tag) => Some(repo.find_tag_oid(tag)?.ok_or_else(|| {
                ReleaseError::tag(format!("Tag '{}' not found locally", tag))
            })?),
            None => None,
        };

        let commits = repo.get_commits_between(base, tip)?;
        info!(
            base = last_tag.unwrap_or("(none)"),
            tip = %tip,
            commits = commits.len(),
            "change window computed"
        );

        Ok(ChangeSet::new(
            last_tag.map(str::to_string),
            tip.to_string(),
            commits,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    fn pattern() -> TagPattern {
        TagPattern::new("v{version}").unwrap()
    }

    #[test]
    fn test_no_prior_tag_uses_whole_history() {
        let repo = MockRepository::new();
        repo.add_commit("chore: init");
        repo.add_commit("feat: first feature");

        let pattern = pattern();
        let analyzer = ChangeAnalyzer::new(&pattern);
        let mut warnings = Vec::new();

        assert_eq!(analyzer.latest_release_tag(&repo, &mut warnings).unwrap(), None);
        let set = analyzer.analyze(&repo, None).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.base_tag, None);
    }

    #[test]
    fn test_window_starts_after_tag() {
        let repo = MockRepository::new();
        let tagged = repo.add_commit("chore: init");
        repo.add_tag("v1.2.3", tagged);
        repo.add_commit("fix: crash");

        let pattern = pattern();
        let analyzer = ChangeAnalyzer::new(&pattern);
        let mut warnings = Vec::new();

        let latest = analyzer
            .latest_release_tag(&repo, &mut warnings)
            .unwrap()
            .unwrap();
        assert_eq!(latest.version, Version::new(1, 2, 3));

        let set = analyzer.analyze(&repo, Some(&latest.name)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.commits()[0].message, "fix: crash");
    }

    #[test]
    fn test_highest_version_wins_and_foreign_tags_ignored() {
        let repo = MockRepository::new();
        let a = repo.add_commit("a");
        let b = repo.add_commit("b");
        repo.add_commit("c");
        repo.add_tag("v1.9.0", b);
        repo.add_tag("v1.10.0", a);
        repo.add_tag("nightly", b);
        repo.add_tag("vnext", b);

        let pattern = pattern();
        let analyzer = ChangeAnalyzer::new(&pattern);
        let mut warnings = Vec::new();

        let latest = analyzer
            .latest_release_tag(&repo, &mut warnings)
            .unwrap()
            .unwrap();
        assert_eq!(latest.name, "v1.10.0");
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], BoundaryWarning::UnparsableTag { .. }));
    }

    #[test]
    fn test_previous_release_tag_and_its_window() {
        let repo = MockRepository::new();
        let first = repo.add_commit("chore: init");
        repo.add_commit("fix: crash");
        let second = repo.add_commit("feat: export");
        repo.add_tag("v1.0.0", first);
        repo.add_tag("v1.1.0", second);

        let pattern = pattern();
        let analyzer = ChangeAnalyzer::new(&pattern);
        let latest = analyzer
            .latest_release_tag(&repo, &mut Vec::new())
            .unwrap()
            .unwrap();
        assert_eq!(latest.name, "v1.1.0");
        assert!(analyzer.analyze(&repo, Some(&latest.name)).unwrap().is_empty());

        let previous = analyzer
            .previous_release_tag(&repo, &latest)
            .unwrap()
            .unwrap();
        assert_eq!(previous.name, "v1.0.0");

        let set = analyzer.window(&repo, Some(&previous.name), second).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.base_tag.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn test_first_tag_has_no_previous_release() {
        let repo = MockRepository::new();
        let only = repo.add_commit("feat: first");
        repo.add_tag("v0.1.0", only);

        let pattern = pattern();
        let analyzer = ChangeAnalyzer::new(&pattern);
        let tag = ReleaseTag {
            name: "v0.1.0".to_string(),
            version: Version::new(0, 1, 0),
        };
        assert_eq!(analyzer.previous_release_tag(&repo, &tag).unwrap(), None);
    }

    #[test]
    fn test_shallow_clone_is_fatal() {
        let repo = MockRepository::new();
        repo.add_commit("chore: init");
        repo.set_shallow(true);

        let pattern = pattern();
        let err = ChangeAnalyzer::new(&pattern).analyze(&repo, None).unwrap_err();
        assert!(matches!(err, ReleaseError::HistoryUnavailable { .. }));
        assert!(err.is_fatal());
    }
}
