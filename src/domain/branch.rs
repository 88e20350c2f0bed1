/// Represents the checked-out branch relative to the configured trunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    /// `None` when HEAD is detached
    pub name: Option<String>,
    pub trunk: String,
}

impl BranchContext {
    /// Create a new branch context
    pub fn new(name: Option<String>, trunk: impl Into<String>) -> Self {
        BranchContext {
            name,
            trunk: trunk.into(),
        }
    }

    /// Releases are only cut from the trunk branch
    pub fn is_trunk(&self) -> bool {
        self.name.as_deref() == Some(self.trunk.as_str())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(detached HEAD)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_branch() {
        let branch = BranchContext::new(Some("main".to_string()), "main");
        assert!(branch.is_trunk());
    }

    #[test]
    fn test_feature_branch() {
        let branch = BranchContext::new(Some("feature/x".to_string()), "main");
        assert!(!branch.is_trunk());
        assert_eq!(branch.display_name(), "feature/x");
    }

    #[test]
    fn test_detached_head() {
        let branch = BranchContext::new(None, "main");
        assert!(!branch.is_trunk());
        assert_eq!(branch.display_name(), "(detached HEAD)");
    }

    #[test]
    fn test_custom_trunk() {
        let branch = BranchContext::new(Some("master".to_string()), "master");
        assert!(branch.is_trunk());
    }
}
