use std::fmt;

/// Soft failures absorbed at component boundaries.
/// These degrade the run but never abort it; each is logged and listed in the run report.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// No new commits since the latest tag
    NoNewCommits {
        latest_tag: String,
        current_commit_hash: String,
    },
    /// Tag matches the pattern but cannot be parsed as a semantic version
    UnparsableTag { tag: String, reason: String },
    /// Fetching tags from the remote failed; local tags are used instead
    FetchFailed { remote: String, reason: String },
    /// The reasoning service timed out or could not be reached
    ReasoningUnavailable { intent: String, reason: String },
    /// The reasoning service answered with something unusable or refused
    ReasoningRejected { intent: String, reason: String },
    /// A pre-existing tag points at a different commit; it is left untouched
    TagTargetMismatch {
        tag: String,
        expected: String,
        actual: String,
    },
    /// A configured artifact file is missing and was not uploaded
    MissingArtifact { path: String },
    /// The version file does not contain the configured pattern
    VersionPatternNotFound { path: String },
    /// Delivering the run report failed
    NotificationFailed { reason: String },
}

fn short(hash: &str) -> &str {
    if hash.len() > 7 {
        &hash[..7]
    } else {
        hash
    }
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoNewCommits {
                latest_tag,
                current_commit_hash,
            } => write!(
                f,
                "No new commits since tag '{}' (current: {})",
                latest_tag,
                short(current_commit_hash)
            ),
            BoundaryWarning::UnparsableTag { tag, reason } => {
                write!(f, "Cannot parse tag '{}': {}", tag, reason)
            }
            BoundaryWarning::FetchFailed { remote, reason } => write!(
                f,
                "Could not fetch tags from remote '{}': {}. Using local tags",
                remote, reason
            ),
            BoundaryWarning::ReasoningUnavailable { intent, reason } => write!(
                f,
                "Reasoning service unavailable for {}: {}",
                intent, reason
            ),
            BoundaryWarning::ReasoningRejected { intent, reason } => write!(
                f,
                "Reasoning service response rejected for {}: {}",
                intent, reason
            ),
            BoundaryWarning::TagTargetMismatch {
                tag,
                expected,
                actual,
            } => write!(
                f,
                "Tag '{}' already points at {} instead of {}; leaving it in place",
                tag,
                short(actual),
                short(expected)
            ),
            BoundaryWarning::MissingArtifact { path } => {
                write!(f, "Artifact '{}' not found; skipping upload", path)
            }
            BoundaryWarning::VersionPatternNotFound { path } => write!(
                f,
                "Version pattern not found in '{}'; nothing to update",
                path
            ),
            BoundaryWarning::NotificationFailed { reason } => {
                write!(f, "Notification delivery failed: {}", reason)
            }
        }
    }
}

impl BoundaryWarning {
    /// Log the warning as a structured event
    pub fn emit(&self) {
        tracing::warn!(warning = %self, "soft failure");
    }
}
