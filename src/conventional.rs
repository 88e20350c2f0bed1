use crate::config::ConventionalCommitsConfig;
use crate::domain::{BumpKind, CommitRecord, ParsedCommit};

/// Local classification of a single commit message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitClass {
    /// Breaking marker present
    Breaking,
    Feature,
    Fix,
    /// Conventional type with no user-relevant change (docs, chore, ci, ...)
    Maintenance,
    /// Neither a conventional type nor a keyword matched
    Unclassified,
}

impl CommitClass {
    /// Bump implied by this class; `None` for unclassified commits
    pub fn bump(&self) -> Option<BumpKind> {
        match self {
            CommitClass::Breaking => Some(BumpKind::Major),
            CommitClass::Feature => Some(BumpKind::Minor),
            CommitClass::Fix => Some(BumpKind::Patch),
            CommitClass::Maintenance => Some(BumpKind::None),
            CommitClass::Unclassified => None,
        }
    }
}

/// Aggregate heuristic result over a change window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClassification {
    pub bump: BumpKind,
    pub breaking: usize,
    pub features: usize,
    pub fixes: usize,
    pub maintenance: usize,
    pub unclassified: usize,
}

impl LocalClassification {
    pub fn has_breaking_marker(&self) -> bool {
        self.breaking > 0
    }

    /// Local heuristics are insufficient when some commit could not be
    /// classified and nothing breaking already settled the outcome.
    pub fn is_ambiguous(&self) -> bool {
        self.unclassified > 0 && !self.has_breaking_marker()
    }

    pub fn describe(&self) -> String {
        format!(
            "{} breaking, {} features, {} fixes, {} maintenance, {} unclassified",
            self.breaking, self.features, self.fixes, self.maintenance, self.unclassified
        )
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .filter(|n| !n.is_empty())
        .any(|n| haystack.contains(n.to_lowercase().as_str()))
}

/// Classify one commit message
pub fn classify_message(message: &str, config: &ConventionalCommitsConfig) -> CommitClass {
    let parsed = ParsedCommit::parse(message);

    let has_indicator = config
        .breaking_change_indicators
        .iter()
        .any(|indicator| !indicator.is_empty() && message.contains(indicator.as_str()));

    if parsed.has_breaking_marker || has_indicator {
        return CommitClass::Breaking;
    }

    if let Some(commit_type) = parsed.r#type.as_deref() {
        if config.minor_types.iter().any(|t| t == commit_type) {
            return CommitClass::Feature;
        }
        if config.patch_types.iter().any(|t| t == commit_type) {
            return CommitClass::Fix;
        }
        if config.types.iter().any(|t| t == commit_type) {
            return CommitClass::Maintenance;
        }
    }

    // Non-conventional (or unknown type): fall back to keywords on the subject
    let subject = parsed.description.to_lowercase();
    if contains_any(&subject, &config.major_keywords) {
        CommitClass::Breaking
    } else if contains_any(&subject, &config.minor_keywords) {
        CommitClass::Feature
    } else if contains_any(&subject, &config.patch_keywords) {
        CommitClass::Fix
    } else {
        CommitClass::Unclassified
    }
}

/// Classify one commit from its message, then its diff scope
///
/// A commit the message rules leave unclassified but that touches no files
/// (an empty commit) carries no user-relevant change.
pub fn classify_commit(commit: &CommitRecord, config: &ConventionalCommitsConfig) -> CommitClass {
    match classify_message(&commit.message, config) {
        CommitClass::Unclassified if commit.stats.files_changed == 0 => CommitClass::Maintenance,
        class => class,
    }
}

/// Classify a change window
///
/// The bump is the maximum over all classified commits, so a breaking marker
/// always wins over features and fixes in the same window. Deterministic for a
/// fixed input.
pub fn classify(commits: &[CommitRecord], config: &ConventionalCommitsConfig) -> LocalClassification {
    let mut result = LocalClassification {
        bump: BumpKind::None,
        breaking: 0,
        features: 0,
        fixes: 0,
        maintenance: 0,
        unclassified: 0,
    };

    for commit in commits {
        let class = classify_commit(commit, config);
        match class {
            CommitClass::Breaking => result.breaking += 1,
            CommitClass::Feature => result.features += 1,
            CommitClass::Fix => result.fixes += 1,
            CommitClass::Maintenance => result.maintenance += 1,
            CommitClass::Unclassified => result.unclassified += 1,
        }
        if let Some(bump) = class.bump() {
            result.bump = result.bump.max(bump);
        }
    }

    result
}
