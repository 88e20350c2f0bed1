use std::fmt::Write;

/// Line-level diff statistics of a commit against its first parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

/// One commit in the change window
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    /// Full commit hash
    pub hash: String,
    pub author: String,
    pub message: String,
    pub stats: DiffStats,
}

impl CommitRecord {
    pub fn short_hash(&self) -> &str {
        if self.hash.len() > 7 {
            &self.hash[..7]
        } else {
            &self.hash
        }
    }

    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

/// Commits between the last published tag and the current head, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub base_tag: Option<String>,
    pub head: String,
    commits: Vec<CommitRecord>,
}

impl ChangeSet {
    pub fn new(base_tag: Option<String>, head: impl Into<String>, commits: Vec<CommitRecord>) -> Self {
        ChangeSet {
            base_tag,
            head: head.into(),
            commits,
        }
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn total_stats(&self) -> DiffStats {
        self.commits
            .iter()
            .fold(DiffStats::default(), |acc, c| DiffStats {
                files_changed: acc.files_changed + c.stats.files_changed,
                insertions: acc.insertions + c.stats.insertions,
                deletions: acc.deletions + c.stats.deletions,
            })
    }

    /// Plain-text digest handed to the reasoning service
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let total = self.total_stats();
        let base = self.base_tag.as_deref().unwrap_or("(no previous release)");

        let _ = writeln!(
            out,
            "{} commits since {} ({} files changed, +{} -{})",
            self.commits.len(),
            base,
            total.files_changed,
            total.insertions,
            total.deletions
        );

        for commit in &self.commits {
            let _ = writeln!(
                out,
                "- {} {} ({}; {} files, +{} -{})",
                commit.short_hash(),
                commit.subject(),
                commit.author,
                commit.stats.files_changed,
                commit.stats.insertions,
                commit.stats.deletions
            );
            for body_line in commit.message.lines().skip(1).filter(|l| !l.trim().is_empty()) {
                let _ = writeln!(out, "    {}", body_line.trim());
            }
        }

        out
    }
}
