use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
///
/// Field order gives the derived ordering: major outranks minor, which outranks patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string, tolerating a leading `v`/`V` (e.g., "v1.2.3" -> Version(1,2,3))
    ///
    /// Pre-release versions are rejected: only plain release triples are versions here.
    pub fn parse(text: &str) -> Result<Self> {
        let clean = text.trim().trim_start_matches('v').trim_start_matches('V');

        let parsed = semver::Version::parse(clean).map_err(|e| {
            ReleaseError::version(format!(
                "Invalid version format: '{}' - expected X.Y.Z ({})",
                text, e
            ))
        })?;

        if !parsed.pre.is_empty() {
            return Err(ReleaseError::version(format!(
                "Pre-release version '{}' is not a release version",
                text
            )));
        }

        Ok(Version::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Bump version according to bump kind
    ///
    /// `BumpKind::None` returns the version unchanged.
    pub fn bump(&self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Version::new(self.major + 1, 0, 0),
            BumpKind::Minor => Version::new(self.major, self.minor + 1, 0),
            BumpKind::Patch => Version::new(self.major, self.minor, self.patch + 1),
            BumpKind::None => *self,
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::new(0, 0, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Serialized as its `X.Y.Z` string form
impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// How a version triple should be incremented for a change set
///
/// Variants are declared in ascending order so `max()` over a window picks the
/// strongest bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    None,
    Patch,
    Minor,
    Major,
}

impl BumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpKind::None => "none",
            BumpKind::Patch => "patch",
            BumpKind::Minor => "minor",
            BumpKind::Major => "major",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpKind {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            "patch" => Ok(BumpKind::Patch),
            "none" => Ok(BumpKind::None),
            other => Err(ReleaseError::version(format!(
                "Unknown bump kind: '{}'",
                other
            ))),
        }
    }
}
