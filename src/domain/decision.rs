use crate::domain::{BumpKind, Version};
use serde::Serialize;

/// Where a version decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    /// Commit conventions alone decided the bump
    Heuristic,
    /// The reasoning service was consulted and answered
    Reasoning,
    /// The reasoning service failed and a fallback was applied
    Degraded,
}

/// Outcome of the version decider
///
/// Fields are private so the invariant holds: `next_version > current_version`
/// exactly when `should_release` is true, and they are equal otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDecision {
    current_version: Version,
    bump_kind: BumpKind,
    next_version: Version,
    should_release: bool,
    rationale: String,
    source: DecisionSource,
}

impl VersionDecision {
    pub fn from_bump(
        current_version: Version,
        bump_kind: BumpKind,
        rationale: impl Into<String>,
        source: DecisionSource,
    ) -> Self {
        VersionDecision {
            current_version,
            bump_kind,
            next_version: current_version.bump(bump_kind),
            should_release: bump_kind != BumpKind::None,
            rationale: rationale.into(),
            source,
        }
    }

    pub fn no_release(
        current_version: Version,
        rationale: impl Into<String>,
        source: DecisionSource,
    ) -> Self {
        Self::from_bump(current_version, BumpKind::None, rationale, source)
    }

    /// Decision for a version whose tag already exists
    ///
    /// Used to finish a release an earlier run left incomplete. The bump kind is
    /// the most significant component that differs.
    pub fn for_existing(
        current_version: Version,
        next_version: Version,
        rationale: impl Into<String>,
        source: DecisionSource,
    ) -> Self {
        if next_version <= current_version {
            return Self::no_release(current_version, rationale, source);
        }
        let bump_kind = if next_version.major != current_version.major {
            BumpKind::Major
        } else if next_version.minor != current_version.minor {
            BumpKind::Minor
        } else {
            BumpKind::Patch
        };
        VersionDecision {
            current_version,
            bump_kind,
            next_version,
            should_release: true,
            rationale: rationale.into(),
            source,
        }
    }

    pub fn current_version(&self) -> Version {
        self.current_version
    }

    pub fn bump_kind(&self) -> BumpKind {
        self.bump_kind
    }

    pub fn next_version(&self) -> Version {
        self.next_version
    }

    pub fn should_release(&self) -> bool {
        self.should_release
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn source(&self) -> DecisionSource {
        self.source
    }
}
