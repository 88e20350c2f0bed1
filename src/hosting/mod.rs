//! Hosting API abstraction: release records and their assets
//!
//! Releases are keyed by tag name. Implementations must make `create_release`
//! safe to repeat: a "release already exists" answer from the host resolves to
//! the existing record instead of an error.

pub mod github;
pub mod mock;

pub use github::{parse_repository_slug, GitHubHost};
pub use mock::InMemoryHost;

use crate::domain::{NewRelease, PublishedAsset, ReleaseRecord};
use crate::error::{ReleaseError, Result};

pub trait ReleaseHost: Send + Sync {
    /// Look up the release attached to `tag_name`, if any
    fn find_release(&self, tag_name: &str) -> Result<Option<ReleaseRecord>>;

    /// Create a release for a tag that already exists on the remote
    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRecord>;

    /// Upload an asset, replacing any existing asset with the same name
    fn upload_asset(&self, release: &ReleaseRecord, asset: &PublishedAsset) -> Result<()>;
}

/// Stands in for a host that could not be configured
///
/// Dry runs never create releases, so they can proceed without a repository
/// slug; any call that does reach the host fails with the setup reason.
pub struct UnavailableHost {
    reason: String,
}

impl UnavailableHost {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableHost {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(ReleaseError::hosting(format!(
            "Hosting is not configured: {}",
            self.reason
        )))
    }
}

impl ReleaseHost for UnavailableHost {
    fn find_release(&self, _tag_name: &str) -> Result<Option<ReleaseRecord>> {
        self.fail()
    }

    fn create_release(&self, _release: &NewRelease) -> Result<ReleaseRecord> {
        self.fail()
    }

    fn upload_asset(&self, _release: &ReleaseRecord, _asset: &PublishedAsset) -> Result<()> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_host_reports_reason() {
        let host = UnavailableHost::new("remote has no URL");
        let err = host.find_release("v1.0.0").unwrap_err();
        assert!(err.to_string().contains("remote has no URL"));
    }
}
