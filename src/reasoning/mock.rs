use crate::domain::Version;
use crate::reasoning::{BumpAssessment, ReasoningError, ReasoningService};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted reasoning service for tests
///
/// Returns the same configured answer on every call and counts invocations.
pub struct MockReasoning {
    bump: Result<BumpAssessment, ReasoningError>,
    notes: Result<String, ReasoningError>,
    bump_calls: AtomicUsize,
    notes_calls: AtomicUsize,
}

impl MockReasoning {
    pub fn new(
        bump: Result<BumpAssessment, ReasoningError>,
        notes: Result<String, ReasoningError>,
    ) -> Self {
        MockReasoning {
            bump,
            notes,
            bump_calls: AtomicUsize::new(0),
            notes_calls: AtomicUsize::new(0),
        }
    }

    /// A service that fails every call with the given error
    pub fn failing(error: ReasoningError) -> Self {
        Self::new(Err(error.clone()), Err(error))
    }

    pub fn bump_calls(&self) -> usize {
        self.bump_calls.load(Ordering::SeqCst)
    }

    pub fn notes_calls(&self) -> usize {
        self.notes_calls.load(Ordering::SeqCst)
    }
}

impl ReasoningService for MockReasoning {
    fn assess_bump(
        &self,
        _summary: &str,
        _current: &Version,
    ) -> Result<BumpAssessment, ReasoningError> {
        self.bump_calls.fetch_add(1, Ordering::SeqCst);
        self.bump.clone()
    }

    fn compose_notes(
        &self,
        _summary: &str,
        _current: &Version,
        _target: &Version,
    ) -> Result<String, ReasoningError> {
        self.notes_calls.fetch_add(1, Ordering::SeqCst);
        self.notes.clone()
    }
}
