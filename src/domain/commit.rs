use regex::Regex;
use std::sync::LazyLock;

static SCOPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\(([^)]+)\)(!?):\s*(.*)").expect("valid regex"));
static BANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)!:\s*(.*)").expect("valid regex"));
static PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+):\s*(.*)").expect("valid regex"));

/// Parsed representation of a conventional commit message
///
/// `r#type` is `None` for messages that do not follow the convention; those
/// are left for keyword matching or the reasoning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub r#type: Option<String>,
    pub scope: Option<String>,
    pub description: String,
    pub has_breaking_marker: bool,
}

impl ParsedCommit {
    /// Parse the subject line of a commit message
    /// Supports formats:
    /// - type(scope)!: description
    /// - type(scope): description
    /// - type!: description
    /// - type: description
    /// - non-conventional text
    ///
    /// Footer indicators such as `BREAKING CHANGE:` are configurable and checked
    /// by the classifier, not here.
    pub fn parse(message: &str) -> Self {
        let subject = message.lines().next().unwrap_or("").trim();

        if let Some(captures) = SCOPED.captures(subject) {
            return ParsedCommit {
                r#type: captures.get(1).map(|m| m.as_str().to_string()),
                scope: captures.get(2).map(|m| m.as_str().to_string()),
                description: captures
                    .get(4)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                has_breaking_marker: captures.get(3).map(|m| m.as_str()) == Some("!"),
            };
        }

        if let Some(captures) = BANG.captures(subject) {
            return ParsedCommit {
                r#type: captures.get(1).map(|m| m.as_str().to_string()),
                scope: None,
                description: captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                has_breaking_marker: true,
            };
        }

        if let Some(captures) = PLAIN.captures(subject) {
            return ParsedCommit {
                r#type: captures.get(1).map(|m| m.as_str().to_string()),
                scope: None,
                description: captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                has_breaking_marker: false,
            };
        }

        ParsedCommit {
            r#type: None,
            scope: None,
            description: subject.to_string(),
            has_breaking_marker: false,
        }
    }

    pub fn is_conventional(&self) -> bool {
        self.r#type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_scope() {
        let commit = ParsedCommit::parse("feat(auth): add login");
        assert_eq!(commit.r#type.as_deref(), Some("feat"));
        assert_eq!(commit.scope, Some("auth".to_string()));
        assert_eq!(commit.description, "add login");
        assert!(!commit.has_breaking_marker);
    }

    #[test]
    fn test_parse_with_breaking_marker() {
        let commit = ParsedCommit::parse("feat(auth)!: redesign login");
        assert_eq!(commit.r#type.as_deref(), Some("feat"));
        assert!(commit.has_breaking_marker);
    }

    #[test]
    fn test_parse_breaking_without_scope() {
        let commit = ParsedCommit::parse("feat!: redesign");
        assert_eq!(commit.scope, None);
        assert!(commit.has_breaking_marker);
    }

    #[test]
    fn test_parse_non_conventional() {
        let commit = ParsedCommit::parse("Random commit message");
        assert_eq!(commit.r#type, None);
        assert!(!commit.is_conventional());
        assert_eq!(commit.description, "Random commit message");
    }

    #[test]
    fn test_parse_only_looks_at_subject() {
        let commit = ParsedCommit::parse("Merge branch 'x'\n\nfix: nested line");
        assert!(!commit.is_conventional());
    }
}
