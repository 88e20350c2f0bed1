use crate::boundary::BoundaryWarning;
use crate::config::ConventionalCommitsConfig;
use crate::conventional::{self, LocalClassification};
use crate::domain::{ChangeSet, DecisionSource, Version, VersionDecision};
use crate::reasoning::{ReasoningError, ReasoningIntent, ReasoningService};
use tracing::info;

/// Decides the bump kind and the release gate for a change window
///
/// Local heuristics decide whenever they can. The reasoning service is asked
/// only when the window holds unclassified commits and no breaking marker.
pub struct VersionDecider<'a> {
    config: &'a ConventionalCommitsConfig,
    reasoning: &'a dyn ReasoningService,
}

impl<'a> VersionDecider<'a> {
    pub fn new(config: &'a ConventionalCommitsConfig, reasoning: &'a dyn ReasoningService) -> Self {
        VersionDecider { config, reasoning }
    }

    pub fn decide(
        &self,
        change_set: &ChangeSet,
        current: Version,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> VersionDecision {
        if change_set.is_empty() {
            return VersionDecision::no_release(
                current,
                "No commits since the last release",
                DecisionSource::Heuristic,
            );
        }

        let local = conventional::classify(change_set.commits(), self.config);

        let decision = if local.is_ambiguous() {
            self.defer(change_set, current, &local, warnings)
        } else {
            VersionDecision::from_bump(
                current,
                local.bump,
                heuristic_rationale(&local),
                DecisionSource::Heuristic,
            )
        };

        info!(
            current = %decision.current_version(),
            next = %decision.next_version(),
            bump = %decision.bump_kind(),
            release = decision.should_release(),
            source = ?decision.source(),
            "version decided"
        );
        decision
    }

    fn defer(
        &self,
        change_set: &ChangeSet,
        current: Version,
        local: &LocalClassification,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> VersionDecision {
        match self.reasoning.assess_bump(&change_set.summary(), &current) {
            Ok(assessment) => VersionDecision::from_bump(
                current,
                local.bump.max(assessment.bump),
                assessment.rationale,
                DecisionSource::Reasoning,
            ),
            Err(ReasoningError::Disabled) => VersionDecision::from_bump(
                current,
                local.bump,
                heuristic_rationale(local),
                DecisionSource::Heuristic,
            ),
            Err(e) if e.is_unavailable() => {
                let warning = BoundaryWarning::ReasoningUnavailable {
                    intent: ReasoningIntent::VersionBump.to_string(),
                    reason: e.to_string(),
                };
                warning.emit();
                warnings.push(warning);

                VersionDecision::from_bump(
                    current,
                    local.bump,
                    format!(
                        "Reasoning service unavailable ({}); {}",
                        e,
                        heuristic_rationale(local)
                    ),
                    DecisionSource::Degraded,
                )
            }
            Err(e) => {
                let warning = BoundaryWarning::ReasoningRejected {
                    intent: ReasoningIntent::VersionBump.to_string(),
                    reason: e.to_string(),
                };
                warning.emit();
                warnings.push(warning);

                VersionDecision::no_release(
                    current,
                    format!("Reasoning service response unusable ({}); not releasing", e),
                    DecisionSource::Degraded,
                )
            }
        }
    }
}

fn heuristic_rationale(local: &LocalClassification) -> String {
    format!("Commit conventions: {} -> {}", local.describe(), local.bump)
}
