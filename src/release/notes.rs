use crate::boundary::BoundaryWarning;
use crate::domain::{ChangeSet, NotesSource, ReleaseNotes, VersionDecision};
use crate::reasoning::{ReasoningError, ReasoningIntent, ReasoningService};
use std::fmt::Write;
use tracing::info;

/// Produces release notes for a decided version
pub struct NoteComposer<'a> {
    reasoning: &'a dyn ReasoningService,
}

impl<'a> NoteComposer<'a> {
    pub fn new(reasoning: &'a dyn ReasoningService) -> Self {
        NoteComposer { reasoning }
    }

    /// Compose notes for `decision.next_version()`
    ///
    /// Never fails: any reasoning failure falls back to the commit-list template.
    pub fn compose(
        &self,
        decision: &VersionDecision,
        change_set: &ChangeSet,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> ReleaseNotes {
        let target = decision.next_version();

        match self.reasoning.compose_notes(
            &change_set.summary(),
            &decision.current_version(),
            &target,
        ) {
            Ok(prose) => {
                info!(version = %target, "release notes composed by reasoning service");
                let body = format!("## {}\n\n{}\n", target, prose.trim());
                ReleaseNotes::new(target, body, NotesSource::Reasoning)
            }
            Err(ReasoningError::Disabled) => {
                ReleaseNotes::new(target, template(decision, change_set), NotesSource::Template)
            }
            Err(e) => {
                let intent = ReasoningIntent::ReleaseNotes.to_string();
                let reason = e.to_string();
                let warning = if e.is_unavailable() {
                    BoundaryWarning::ReasoningUnavailable { intent, reason }
                } else {
                    BoundaryWarning::ReasoningRejected { intent, reason }
                };
                warning.emit();
                warnings.push(warning);

                ReleaseNotes::new(target, template(decision, change_set), NotesSource::Template)
            }
        }
    }
}

/// Version heading followed by one line per commit
pub fn template(decision: &VersionDecision, change_set: &ChangeSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## {}", decision.next_version());
    out.push('\n');
    for commit in change_set.commits() {
        let _ = writeln!(out, "- {} ({})", commit.subject(), commit.short_hash());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BumpKind, CommitRecord, DecisionSource, DiffStats, Version};
    use crate::reasoning::{DisabledReasoning, MockReasoning};

    fn change_set() -> ChangeSet {
        let commits = vec![
            CommitRecord {
                hash: "1111111aaaaaaa".to_string(),
                author: "A".to_string(),
                message: "fix: crash on empty input\n\nDetails".to_string(),
                stats: DiffStats::default(),
            },
            CommitRecord {
                hash: "2222222bbbbbbb".to_string(),
                author: "B".to_string(),
                message: "docs: readme".to_string(),
                stats: DiffStats::default(),
            },
        ];
        ChangeSet::new(Some("v1.2.3".to_string()), "2222222bbbbbbb", commits)
    }

    fn decision() -> VersionDecision {
        VersionDecision::from_bump(
            Version::new(1, 2, 3),
            BumpKind::Patch,
            "fix present",
            DecisionSource::Heuristic,
        )
    }

    #[test]
    fn test_timeout_falls_back_to_template() {
        let service = MockReasoning::failing(ReasoningError::Timeout(30));
        let composer = NoteComposer::new(&service);
        let mut warnings = Vec::new();

        let notes = composer.compose(&decision(), &change_set(), &mut warnings);

        assert_eq!(notes.source(), NotesSource::Template);
        assert_eq!(notes.version(), Version::new(1, 2, 4));
        assert!(notes.body().starts_with("## 1.2.4\n"));
        assert!(notes.body().contains("- fix: crash on empty input (1111111)"));
        assert!(notes.body().contains("- docs: readme (2222222)"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_reasoning_prose_is_used() {
        let service = MockReasoning::new(
            Err(ReasoningError::Disabled),
            Ok("Fixes a crash when input is empty.".to_string()),
        );
        let composer = NoteComposer::new(&service);

        let notes = composer.compose(&decision(), &change_set(), &mut Vec::new());
        assert_eq!(notes.source(), NotesSource::Reasoning);
        assert_eq!(notes.body(), "## 1.2.4\n\nFixes a crash when input is empty.\n");
        assert_eq!(service.notes_calls(), 1);
    }

    #[test]
    fn test_refusal_is_recorded_as_rejected() {
        let service = MockReasoning::failing(ReasoningError::Refused("policy".into()));
        let composer = NoteComposer::new(&service);
        let mut warnings = Vec::new();

        let notes = composer.compose(&decision(), &change_set(), &mut warnings);
        assert_eq!(notes.source(), NotesSource::Template);
        assert!(matches!(warnings[0], BoundaryWarning::ReasoningRejected { .. }));
    }

    #[test]
    fn test_disabled_service_is_silent() {
        let composer = NoteComposer::new(&DisabledReasoning);
        let mut warnings = Vec::new();
        let notes = composer.compose(&decision(), &change_set(), &mut warnings);
        assert_eq!(notes.source(), NotesSource::Template);
        assert!(warnings.is_empty());
    }
}
