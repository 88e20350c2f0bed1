use crate::domain::{CommitRecord, DiffStats};
use crate::error::{ReleaseError, Result};
use crate::git::TagCreation;
use git2::{
    BranchType, Cred, CredentialType, Direction, ErrorClass, ErrorCode, FetchOptions, Oid,
    PushOptions, RemoteCallbacks, Repository as Git2Repo, Signature, Sort,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Wrapper around git2::Repository with our trait interface
///
/// `git2::Repository` is `Send` but not `Sync`, so access is serialized
/// through a mutex.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
    /// HTTPS token used for plaintext credential requests (e.g. CI tokens)
    token: Option<String>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Ok(Self::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
            token: None,
        }
    }

    /// Use a token for HTTPS remotes
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn repo(&self) -> Result<MutexGuard<'_, Git2Repo>> {
        self.repo
            .lock()
            .map_err(|_| ReleaseError::remote("repository lock poisoned"))
    }

    /// Credential callbacks shared by fetch, ls-remote and push
    ///
    /// Tries the configured token for HTTPS, then SSH keys from ~/.ssh and the
    /// SSH agent, then libgit2 defaults. Gives up after a few attempts so a bad
    /// credential cannot loop forever.
    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let attempts = Cell::new(0usize);
        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = self.token.as_deref() {
                    return Cred::userpass_plaintext("x-access-token", token);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) {
                let user = username_from_url.unwrap_or("git");
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = Cred::ssh_key(user, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
                if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                    return Ok(cred);
                }
            }

            Cred::default()
        });

        callbacks
    }

    fn signature(repo: &Git2Repo) -> Result<Signature<'static>> {
        match repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("git-release", "git-release@localhost")?),
        }
    }

    fn diff_stats(repo: &Git2Repo, commit: &git2::Commit<'_>) -> Result<DiffStats> {
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let stats = diff.stats()?;

        Ok(DiffStats {
            files_changed: stats.files_changed(),
            insertions: stats.insertions(),
            deletions: stats.deletions(),
        })
    }

    fn push_refspecs(&self, remote_name: &str, refspecs: &[String]) -> Result<()> {
        let repo = self.repo()?;
        let mut remote = repo
            .find_remote(remote_name)
            .map_err(|_| ReleaseError::remote(format!("No remote named '{}' found", remote_name)))?;

        let rejected: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let mut callbacks = self.callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejected
                    .borrow_mut()
                    .push(format!("{}: {}", refname, status));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let specs: Vec<&str> = refspecs.iter().map(|s| s.as_str()).collect();
        remote
            .push(&specs, Some(&mut push_options))
            .map_err(|e| match e.class() {
                ErrorClass::Net => ReleaseError::remote(format!("Network error during push: {}", e)),
                ErrorClass::Reference => {
                    ReleaseError::remote(format!("Reference error during push: {}", e))
                }
                _ => ReleaseError::remote(format!("Push to '{}' failed: {}", remote_name, e)),
            })?;
        drop(push_options);

        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(ReleaseError::remote(format!(
                "Push rejected: {}",
                rejected.join(", ")
            )));
        }

        Ok(())
    }
}

impl super::Repository for Git2Repository {
    fn is_shallow(&self) -> bool {
        self.repo().map(|r| r.is_shallow()).unwrap_or(false)
    }

    fn workdir(&self) -> Option<PathBuf> {
        self.repo().ok()?.workdir().map(Path::to_path_buf)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(str::to_string))
        } else {
            Ok(None)
        }
    }

    fn head_oid(&self) -> Result<Oid> {
        let repo = self.repo()?;
        let commit = repo.head()?.peel_to_commit()?;
        Ok(commit.id())
    }

    fn get_commits_between(&self, from_oid: Option<Oid>, to_oid: Oid) -> Result<Vec<CommitRecord>> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(to_oid)?;
        if let Some(from) = from_oid {
            revwalk.hide(from)?;
        }

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;

            commits.push(CommitRecord {
                hash: oid.to_string(),
                author: commit.author().name().unwrap_or("unknown").to_string(),
                message: commit.message().unwrap_or("(empty message)").to_string(),
                stats: Self::diff_stats(&repo, &commit)?,
            });
        }

        commits.reverse();
        Ok(commits)
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        let repo = self.repo()?;
        Ok(repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        let repo = self.repo()?;
        let reference_name = format!("refs/tags/{}", tag_name);

        let found = repo.find_reference(&reference_name);
        let target = match found {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| ReleaseError::tag(format!("Cannot peel tag '{}': {}", tag_name, e)))?;
                Some(commit.id())
            }
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => {
                return Err(ReleaseError::tag(format!(
                    "Cannot find tag '{}': {}",
                    tag_name, e
                )))
            }
        };
        Ok(target)
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let repo = self.repo()?;
        let tags = repo.tag_names(None)?;
        Ok(tags.iter().flatten().map(|s| s.to_string()).collect())
    }

    fn create_annotated_tag(&self, name: &str, oid: Oid, message: &str) -> Result<TagCreation> {
        let repo = self.repo()?;
        let object = repo
            .find_object(oid, None)
            .map_err(|e| ReleaseError::tag(format!("Cannot find object {}: {}", oid, e)))?;
        let tagger = Self::signature(&repo)?;

        match repo.tag(name, &object, &tagger, message, false) {
            Ok(_) => Ok(TagCreation::Created),
            Err(e) if e.code() == ErrorCode::Exists => Ok(TagCreation::AlreadyExists),
            Err(e) => Err(ReleaseError::tag(format!(
                "Cannot create tag '{}': {}",
                name, e
            ))),
        }
    }

    fn remote_tag_oid(&self, remote_name: &str, tag_name: &str) -> Result<Option<Oid>> {
        let repo = self.repo()?;
        let mut remote = repo
            .find_remote(remote_name)
            .map_err(|_| ReleaseError::remote(format!("No remote named '{}' found", remote_name)))?;

        let connection = remote
            .connect_auth(Direction::Fetch, Some(self.callbacks()), None)
            .map_err(|e| {
                ReleaseError::remote(format!("Cannot connect to '{}': {}", remote_name, e))
            })?;

        let wanted = format!("refs/tags/{}", tag_name);
        let peeled = format!("{}^{{}}", wanted);
        let mut direct = None;
        let mut commit = None;
        for head in connection.list()? {
            if head.name() == peeled {
                commit = Some(head.oid());
            } else if head.name() == wanted {
                direct = Some(head.oid());
            }
        }

        // Annotated tags advertise the peeled commit as `<tag>^{}`
        Ok(commit.or(direct))
    }

    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()> {
        let refspecs: Vec<String> = tag_names
            .iter()
            .map(|tag| format!("refs/tags/{}:refs/tags/{}", tag, tag))
            .collect();
        self.push_refspecs(remote, &refspecs)
    }

    fn fetch_tags(&self, remote_name: &str) -> Result<()> {
        let repo = self.repo()?;
        let mut remote = repo
            .find_remote(remote_name)
            .map_err(|_| ReleaseError::remote(format!("Remote '{}' not found", remote_name)))?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.callbacks());

        remote
            .fetch(&["+refs/tags/*:refs/tags/*"], Some(&mut fetch_options), None)
            .map_err(|e| {
                ReleaseError::remote(format!(
                    "Failed to fetch tags from '{}': {}",
                    remote_name, e
                ))
            })?;

        Ok(())
    }

    fn remote_url(&self, remote_name: &str) -> Result<Option<String>> {
        let repo = self.repo()?;
        let found = repo.find_remote(remote_name);
        let url = match found {
            Ok(remote) => remote.url().map(str::to_string),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(url)
    }

    fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let parent = repo.head()?.peel_to_commit()?;
        let signature = Self::signature(&repo)?;

        let oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;
        Ok(oid)
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        {
            let repo = self.repo()?;
            repo.find_branch(branch, BranchType::Local).map_err(|e| {
                ReleaseError::remote(format!("Cannot find branch '{}': {}", branch, e))
            })?;
        }
        self.push_refspecs(
            remote,
            &[format!("refs/heads/{}:refs/heads/{}", branch, branch)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use std::fs;
    use tempfile::TempDir;

    fn commit_file(repo: &Git2Repo, dir: &Path, name: &str, content: &str, message: &str) -> Oid {
        fs::write(dir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parents: Vec<git2::Commit<'_>> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_commits_and_stats() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let first = commit_file(&raw, dir.path(), "a.txt", "one\n", "chore: init");
        commit_file(&raw, dir.path(), "a.txt", "one\ntwo\nthree\n", "feat: grow");

        let repo = Git2Repository::from_git2(raw);
        let head = repo.head_oid().unwrap();

        let all = repo.get_commits_between(None, head).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "chore: init");

        let since = repo.get_commits_between(Some(first), head).unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].message, "feat: grow");
        assert_eq!(since[0].stats.files_changed, 1);
        assert_eq!(since[0].stats.insertions, 2);

        assert!(repo.is_ancestor(first, head).unwrap());
        assert!(!repo.is_ancestor(head, first).unwrap());
        assert!(!repo.is_shallow());
    }

    #[test]
    fn test_annotated_tag_never_moves() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let first = commit_file(&raw, dir.path(), "a.txt", "1", "chore: one");
        let second = commit_file(&raw, dir.path(), "a.txt", "2", "fix: two");

        let repo = Git2Repository::from_git2(raw);
        assert_eq!(
            repo.create_annotated_tag("v1.0.0", first, "v1.0.0").unwrap(),
            TagCreation::Created
        );
        assert_eq!(
            repo.create_annotated_tag("v1.0.0", second, "v1.0.0").unwrap(),
            TagCreation::AlreadyExists
        );
        assert_eq!(repo.find_tag_oid("v1.0.0").unwrap(), Some(first));
        assert_eq!(repo.find_tag_oid("v9.9.9").unwrap(), None);
        assert_eq!(repo.list_tags().unwrap(), vec!["v1.0.0".to_string()]);
    }

    #[test]
    fn test_commit_paths() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let first = commit_file(&raw, dir.path(), "VERSION", "1.0.0\n", "chore: init");

        let repo = Git2Repository::from_git2(raw);
        fs::write(dir.path().join("VERSION"), "1.0.1\n").unwrap();
        let oid = repo
            .commit_paths(&[Path::new("VERSION")], "chore(release): 1.0.1")
            .unwrap();

        assert_ne!(oid, first);
        assert_eq!(repo.head_oid().unwrap(), oid);
        let commits = repo.get_commits_between(Some(first), oid).unwrap();
        assert_eq!(commits[0].message, "chore(release): 1.0.1");
    }
}
