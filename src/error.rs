use thiserror::Error;

/// Unified error type for git-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Full history unavailable in '{path}': shallow clones cannot be analyzed")]
    HistoryUnavailable { path: String },

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Hosting API error: {0}")]
    Hosting(String),

    #[error("Stage error: {0}")]
    Stage(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        ReleaseError::Tag(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// Create a hosting error with context
    pub fn hosting(msg: impl Into<String>) -> Self {
        ReleaseError::Hosting(msg.into())
    }

    /// Fatal errors abort the run before any mutation and are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReleaseError::Config(_) | ReleaseError::HistoryUnavailable { .. }
        )
    }
}
