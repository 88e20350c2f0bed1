//! Git access for the release pipeline
//!
//! Everything the pipeline needs from git goes through the [Repository]
//! trait: history walks, tag lookups at both scopes, tag and branch pushes,
//! and the version-bump commit.
//!
//! - [repository::Git2Repository] talks to a real repository through `git2`
//! - [mock::MockRepository] keeps commits, tags and a fake remote in memory
//!
//! Tag and remote state is always queried live; nothing here caches it.
//!
//! ```rust
//! # use git_release::git::Repository;
//! # fn window<R: Repository>(repo: &R) -> Result<usize, Box<dyn std::error::Error>> {
//! let head = repo.head_oid()?;
//! Ok(repo.get_commits_between(None, head)?.len())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::CommitRecord;
use crate::error::Result;
use git2::Oid;
use std::path::{Path, PathBuf};

/// Result of asking for a tag to be created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCreation {
    Created,
    /// Someone else created the tag first; it was left untouched
    AlreadyExists,
}

/// Common git operation trait for abstraction
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync` to allow safe sharing across threads.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map underlying
/// errors (like `git2::Error`) to the appropriate [crate::error::ReleaseError]
/// variants.
pub trait Repository: Send + Sync {
    /// Whether the repository was cloned with truncated history
    fn is_shallow(&self) -> bool;

    /// Root of the working tree, `None` for bare repositories
    fn workdir(&self) -> Option<PathBuf>;

    /// Short name of the checked-out branch, `None` when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// Commit HEAD points at
    fn head_oid(&self) -> Result<Oid>;

    /// Get commits between two OIDs
    ///
    /// Returns commits reachable from `to_oid` (inclusive) but not from
    /// `from_oid` (exclusive), oldest first. `None` walks the whole history.
    fn get_commits_between(&self, from_oid: Option<Oid>, to_oid: Oid) -> Result<Vec<CommitRecord>>;

    /// Whether `ancestor` is `descendant` or reachable from it
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool>;

    /// Find a local tag by name and return the commit it points at
    ///
    /// Handles both lightweight and annotated tags.
    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>>;

    /// Get all local tag names
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Create an annotated tag at the given commit
    ///
    /// Never moves an existing tag: if the name is taken the call reports
    /// [TagCreation::AlreadyExists].
    fn create_annotated_tag(&self, name: &str, oid: Oid, message: &str) -> Result<TagCreation>;

    /// Ask the remote (not the local remote-tracking state) which commit a tag points at
    fn remote_tag_oid(&self, remote: &str, tag_name: &str) -> Result<Option<Oid>>;

    /// Whether the remote has the tag at all
    fn remote_has_tag(&self, remote: &str, tag_name: &str) -> Result<bool> {
        Ok(self.remote_tag_oid(remote, tag_name)?.is_some())
    }

    /// Push tags to remote
    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()>;

    /// Fetch all tags from a remote
    fn fetch_tags(&self, remote: &str) -> Result<()>;

    /// URL configured for a remote
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;

    /// Stage the given worktree-relative paths and commit them on HEAD
    fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid>;

    /// Push a local branch to the same name on the remote
    fn push_branch(&self, remote: &str, branch: &str) -> Result<()>;
}
