use crate::domain::{CommitRecord, DiffStats};
use crate::error::{ReleaseError, Result};
use crate::git::{Repository, TagCreation};
use git2::Oid;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Recorded side effects, for assertions in tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub tags_created: Vec<String>,
    pub tags_pushed: Vec<String>,
    pub commits_made: Vec<String>,
    pub branches_pushed: Vec<String>,
    pub fetches: usize,
}

#[derive(Debug, Default)]
struct MockState {
    /// Linear history, oldest first
    history: Vec<(Oid, CommitRecord)>,
    local_tags: BTreeMap<String, Oid>,
    remote_tags: BTreeMap<String, Oid>,
    branch: Option<String>,
    shallow: bool,
    remote_reachable: bool,
    /// Tags whose push fails once as if another run won the race
    racing_tags: BTreeSet<String>,
    /// Tags another run creates locally just before our create call
    racing_creates: BTreeSet<String>,
    workdir: Option<PathBuf>,
    calls: MockCalls,
}

/// In-memory repository with a linear history, for testing without git
pub struct MockRepository {
    state: Mutex<MockState>,
}

/// Deterministic object id for the n-th mock commit
pub fn mock_oid(n: usize) -> Oid {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(n as u64 + 1).to_be_bytes());
    Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
}

impl MockRepository {
    /// Create a new empty mock repository on branch `main`
    pub fn new() -> Self {
        MockRepository {
            state: Mutex::new(MockState {
                branch: Some("main".to_string()),
                remote_reachable: true,
                ..MockState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a commit to the history and return its id
    pub fn add_commit(&self, message: &str) -> Oid {
        let mut state = self.state();
        let oid = mock_oid(state.history.len());
        let record = CommitRecord {
            hash: oid.to_string(),
            author: "Mock Author".to_string(),
            message: message.to_string(),
            stats: DiffStats {
                files_changed: 1,
                insertions: 1,
                deletions: 0,
            },
        };
        state.history.push((oid, record));
        oid
    }

    /// Add a local tag pointing to an OID
    pub fn add_tag(&self, name: impl Into<String>, oid: Oid) {
        self.state().local_tags.insert(name.into(), oid);
    }

    /// Add a tag that exists only on the remote
    pub fn add_remote_tag(&self, name: impl Into<String>, oid: Oid) {
        self.state().remote_tags.insert(name.into(), oid);
    }

    /// Set the checked-out branch (`None` for detached HEAD)
    pub fn set_branch(&self, branch: Option<&str>) {
        self.state().branch = branch.map(str::to_string);
    }

    pub fn set_shallow(&self, shallow: bool) {
        self.state().shallow = shallow;
    }

    pub fn set_remote_reachable(&self, reachable: bool) {
        self.state().remote_reachable = reachable;
    }

    pub fn set_workdir(&self, dir: impl Into<PathBuf>) {
        self.state().workdir = Some(dir.into());
    }

    /// Simulate a concurrent run pushing `name` between our check and our push
    pub fn race_on_push(&self, name: impl Into<String>) {
        self.state().racing_tags.insert(name.into());
    }

    /// Simulate a concurrent run creating tag `name` between our check and our create
    pub fn race_on_create(&self, name: impl Into<String>) {
        self.state().racing_creates.insert(name.into());
    }

    pub fn local_tags(&self) -> BTreeMap<String, Oid> {
        self.state().local_tags.clone()
    }

    pub fn remote_tags(&self) -> BTreeMap<String, Oid> {
        self.state().remote_tags.clone()
    }

    pub fn calls(&self) -> MockCalls {
        self.state().calls.clone()
    }

    fn position(state: &MockState, oid: Oid) -> Result<usize> {
        state
            .history
            .iter()
            .position(|(o, _)| *o == oid)
            .ok_or_else(|| ReleaseError::tag(format!("Unknown commit {}", oid)))
    }

    fn ensure_remote(state: &MockState, remote: &str) -> Result<()> {
        if state.remote_reachable {
            Ok(())
        } else {
            Err(ReleaseError::remote(format!(
                "Cannot connect to '{}': unreachable",
                remote
            )))
        }
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn is_shallow(&self) -> bool {
        self.state().shallow
    }

    fn workdir(&self) -> Option<PathBuf> {
        self.state().workdir.clone()
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state().branch.clone())
    }

    fn head_oid(&self) -> Result<Oid> {
        self.state()
            .history
            .last()
            .map(|(oid, _)| *oid)
            .ok_or_else(|| ReleaseError::tag("Repository has no commits"))
    }

    fn get_commits_between(&self, from_oid: Option<Oid>, to_oid: Oid) -> Result<Vec<CommitRecord>> {
        let state = self.state();
        let end = Self::position(&state, to_oid)?;
        let start = match from_oid {
            Some(from) => Self::position(&state, from)? + 1,
            None => 0,
        };
        if start > end {
            return Ok(Vec::new());
        }
        Ok(state.history[start..=end]
            .iter()
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        let state = self.state();
        Ok(Self::position(&state, ancestor)? <= Self::position(&state, descendant)?)
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        Ok(self.state().local_tags.get(tag_name).copied())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.state().local_tags.keys().cloned().collect())
    }

    fn create_annotated_tag(&self, name: &str, oid: Oid, _message: &str) -> Result<TagCreation> {
        let mut state = self.state();
        if state.racing_creates.remove(name) {
            state.local_tags.insert(name.to_string(), oid);
        }
        if state.local_tags.contains_key(name) {
            return Ok(TagCreation::AlreadyExists);
        }
        state.local_tags.insert(name.to_string(), oid);
        state.calls.tags_created.push(name.to_string());
        Ok(TagCreation::Created)
    }

    fn remote_tag_oid(&self, remote: &str, tag_name: &str) -> Result<Option<Oid>> {
        let state = self.state();
        Self::ensure_remote(&state, remote)?;
        Ok(state.remote_tags.get(tag_name).copied())
    }

    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()> {
        let mut state = self.state();
        Self::ensure_remote(&state, remote)?;

        for name in tag_names {
            let oid = state
                .local_tags
                .get(*name)
                .copied()
                .ok_or_else(|| ReleaseError::remote(format!("src refspec {} does not match any", name)))?;

            if state.racing_tags.remove(*name) {
                state.remote_tags.insert(name.to_string(), oid);
                return Err(ReleaseError::remote(format!(
                    "Push rejected: refs/tags/{}: already exists",
                    name
                )));
            }
            if state.remote_tags.contains_key(*name) {
                return Err(ReleaseError::remote(format!(
                    "Push rejected: refs/tags/{}: already exists",
                    name
                )));
            }

            state.remote_tags.insert(name.to_string(), oid);
            state.calls.tags_pushed.push(name.to_string());
        }
        Ok(())
    }

    fn fetch_tags(&self, remote: &str) -> Result<()> {
        let mut state = self.state();
        Self::ensure_remote(&state, remote)?;
        let remote_tags = state.remote_tags.clone();
        state.local_tags.extend(remote_tags);
        state.calls.fetches += 1;
        Ok(())
    }

    fn remote_url(&self, _remote: &str) -> Result<Option<String>> {
        Ok(Some("https://github.com/example/project.git".to_string()))
    }

    fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid> {
        if paths.is_empty() {
            return Err(ReleaseError::tag("Nothing to commit"));
        }
        let oid = self.add_commit(message);
        self.state().calls.commits_made.push(message.to_string());
        Ok(oid)
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let mut state = self.state();
        Self::ensure_remote(&state, remote)?;
        state.calls.branches_pushed.push(branch.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_repository_history() {
        let repo = MockRepository::new();
        let first = repo.add_commit("chore: init");
        let second = repo.add_commit("feat: a");
        let third = repo.add_commit("fix: b");

        assert_eq!(repo.head_oid().unwrap(), third);
        assert_eq!(repo.get_commits_between(None, third).unwrap().len(), 3);

        let since = repo.get_commits_between(Some(first), third).unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].message, "feat: a");

        assert!(repo.is_ancestor(first, second).unwrap());
        assert!(!repo.is_ancestor(third, second).unwrap());
    }

    #[test]
    fn test_mock_repository_tags() {
        let repo = MockRepository::new();
        let oid = repo.add_commit("chore: init");

        repo.add_tag("v1.0.0", oid);

        assert_eq!(repo.find_tag_oid("v1.0.0").unwrap(), Some(oid));
        assert_eq!(repo.find_tag_oid("v2.0.0").unwrap(), None);
        assert!(!repo.remote_has_tag("origin", "v1.0.0").unwrap());
    }

    #[test]
    fn test_mock_push_and_fetch() {
        let repo = MockRepository::new();
        let oid = repo.add_commit("chore: init");
        repo.create_annotated_tag("v1.0.0", oid, "v1.0.0").unwrap();
        repo.push_tags("origin", &["v1.0.0"]).unwrap();
        assert!(repo.remote_has_tag("origin", "v1.0.0").unwrap());

        assert_eq!(repo.remote_tag_oid("origin", "v1.0.0").unwrap(), Some(oid));
        assert_eq!(repo.remote_tag_oid("origin", "v2.0.0").unwrap(), None);

        repo.add_remote_tag("v0.9.0", oid);
        repo.fetch_tags("origin").unwrap();
        assert!(repo.list_tags().unwrap().contains(&"v0.9.0".to_string()));
        assert_eq!(repo.calls().fetches, 1);
    }

    #[test]
    fn test_mock_unreachable_remote() {
        let repo = MockRepository::new();
        repo.set_remote_reachable(false);
        assert!(repo.remote_has_tag("origin", "v1.0.0").is_err());
        assert!(repo.fetch_tags("origin").is_err());
    }

    #[test]
    fn test_mock_oid_is_unique() {
        assert_ne!(mock_oid(0), mock_oid(1));
        assert_ne!(mock_oid(0), Oid::zero());
    }
}
