//! External reasoning service consulted for ambiguous version bumps and
//! release-note prose.
//!
//! The service is opaque: git-release only relies on the request/response
//! contract below. Every failure is a soft failure; callers fall back to local
//! heuristics or templated output and never abort the run.

pub mod http;
pub mod mock;

pub use http::HttpReasoningService;
pub use mock::MockReasoning;

use crate::domain::{BumpKind, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What the service is being asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasoningIntent {
    VersionBump,
    ReleaseNotes,
}

impl fmt::Display for ReasoningIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningIntent::VersionBump => f.write_str("version-bump"),
            ReasoningIntent::ReleaseNotes => f.write_str("release-notes"),
        }
    }
}

/// Request body sent to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasoningRequest {
    pub intent: ReasoningIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub summary: String,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
}

/// The service's classification of a change window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpAssessment {
    pub bump: BumpKind,
    pub rationale: String,
}

/// Why a reasoning call produced nothing usable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReasoningError {
    #[error("reasoning service is disabled")]
    Disabled,

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("service refused the request: {0}")]
    Refused(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ReasoningError {
    /// The service could not be reached at all (as opposed to answering badly)
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ReasoningError::Disabled | ReasoningError::Timeout(_) | ReasoningError::Unavailable(_)
        )
    }
}

/// Contract of the reasoning collaborator
///
/// Each call is one bounded, synchronous request with no retry.
pub trait ReasoningService: Send + Sync {
    fn assess_bump(
        &self,
        summary: &str,
        current: &Version,
    ) -> Result<BumpAssessment, ReasoningError>;

    fn compose_notes(
        &self,
        summary: &str,
        current: &Version,
        target: &Version,
    ) -> Result<String, ReasoningError>;
}

/// Stand-in used when no service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledReasoning;

impl ReasoningService for DisabledReasoning {
    fn assess_bump(
        &self,
        _summary: &str,
        _current: &Version,
    ) -> Result<BumpAssessment, ReasoningError> {
        Err(ReasoningError::Disabled)
    }

    fn compose_notes(
        &self,
        _summary: &str,
        _current: &Version,
        _target: &Version,
    ) -> Result<String, ReasoningError> {
        Err(ReasoningError::Disabled)
    }
}
