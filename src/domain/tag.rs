use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use std::fmt;

/// Tag naming pattern (e.g., "v{version}", "release-{version}")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPattern {
    pub pattern: String,
}

impl TagPattern {
    /// Create a new tag pattern, rejecting patterns without a `{version}` placeholder
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.matches("{version}").count() != 1 {
            return Err(ReleaseError::config(format!(
                "Tag pattern '{}' must contain exactly one {{version}} placeholder",
                pattern
            )));
        }
        Ok(TagPattern { pattern })
    }

    /// Format a version according to pattern
    /// Example: pattern="v{version}", version=1.2.3 -> "v1.2.3"
    pub fn format(&self, version: &Version) -> String {
        self.pattern.replace("{version}", &version.to_string())
    }

    /// Return the version portion of a tag name if the tag follows this pattern
    pub fn extract<'a>(&self, tag: &'a str) -> Option<&'a str> {
        let (prefix, suffix) = self.pattern.split_once("{version}")?;
        let inner = tag.strip_prefix(prefix)?.strip_suffix(suffix)?;
        if inner.is_empty() {
            None
        } else {
            Some(inner)
        }
    }
}

/// Observed position of a tag in the publish state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TagState {
    NotTagged,
    TaggedLocal,
    TaggedRemote,
    Released,
}

impl fmt::Display for TagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagState::NotTagged => "NOT_TAGGED",
            TagState::TaggedLocal => "TAGGED_LOCAL",
            TagState::TaggedRemote => "TAGGED_REMOTE",
            TagState::Released => "RELEASED",
        };
        f.write_str(name)
    }
}

/// A release tag as seen across the local repository and the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    /// Commit the tag should point at (full hash)
    pub target: String,
    pub local: bool,
    pub remote: bool,
}

impl TagRecord {
    /// Tagging state implied by existence at the two scopes
    ///
    /// A remote tag is terminal for tagging even if it was never fetched locally.
    pub fn state(&self) -> TagState {
        if self.remote {
            TagState::TaggedRemote
        } else if self.local {
            TagState::TaggedLocal
        } else {
            TagState::NotTagged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_format() {
        let pattern = TagPattern::new("v{version}").unwrap();
        assert_eq!(pattern.format(&Version::new(1, 2, 3)), "v1.2.3");
    }

    #[test]
    fn test_pattern_format_with_suffix() {
        let pattern = TagPattern::new("release-{version}-final").unwrap();
        assert_eq!(
            pattern.format(&Version::new(1, 2, 3)),
            "release-1.2.3-final"
        );
    }

    #[test]
    fn test_pattern_requires_placeholder() {
        assert!(TagPattern::new("v1").is_err());
        assert!(TagPattern::new("{version}-{version}").is_err());
    }

    #[test]
    fn test_pattern_extract() {
        let pattern = TagPattern::new("v{version}").unwrap();
        assert_eq!(pattern.extract("v1.2.3"), Some("1.2.3"));
        assert_eq!(pattern.extract("release-1.2.3"), None);
        assert_eq!(pattern.extract("v"), None);
    }

    #[test]
    fn test_bare_pattern_extract() {
        let pattern = TagPattern::new("{version}").unwrap();
        assert_eq!(pattern.extract("1.2.4"), Some("1.2.4"));
    }

    #[test]
    fn test_record_state() {
        let mut record = TagRecord {
            name: "v1.0.0".to_string(),
            target: "abc".to_string(),
            local: false,
            remote: false,
        };
        assert_eq!(record.state(), TagState::NotTagged);

        record.local = true;
        assert_eq!(record.state(), TagState::TaggedLocal);

        record.remote = true;
        assert_eq!(record.state(), TagState::TaggedRemote);

        record.local = false;
        assert_eq!(record.state(), TagState::TaggedRemote);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TagState::TaggedRemote.to_string(), "TAGGED_REMOTE");
    }
}
