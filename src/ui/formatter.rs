//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text; `display_*` functions print it.
//! Styling goes through `console`, which drops colors when stdout is not a tty.

use crate::boundary::BoundaryWarning;
use crate::domain::{DecisionSource, VersionDecision};
use crate::report::{RunOutcome, RunReport};
use crate::stages::StageStatus;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

pub fn format_stage_status(status: &StageStatus) -> String {
    match status {
        StageStatus::Passed => style("passed").green().to_string(),
        StageStatus::Skipped => style("skipped").dim().to_string(),
        StageStatus::Failed(reason) => {
            let first_line = reason.lines().next().unwrap_or("");
            format!("{} ({})", style("failed").red(), first_line)
        }
    }
}

/// One line describing the version decision, e.g. `1.2.3 -> 1.2.4 (patch, heuristic)`
pub fn format_decision(decision: &VersionDecision) -> String {
    let source = match decision.source() {
        DecisionSource::Heuristic => "heuristic",
        DecisionSource::Reasoning => "reasoning service",
        DecisionSource::Degraded => "degraded",
    };
    if decision.should_release() {
        format!(
            "{} -> {} ({}, {})",
            decision.current_version(),
            style(decision.next_version()).green().bold(),
            decision.bump_kind(),
            source
        )
    } else {
        format!(
            "{} unchanged ({}): {}",
            decision.current_version(),
            source,
            decision.rationale()
        )
    }
}

pub fn format_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Released { tag, version } => {
            format!("Released {} (version {})", style(tag).green().bold(), version)
        }
        RunOutcome::NoRelease { reason } => format!("No release: {}", reason),
        RunOutcome::Failed { stage, error } => {
            format!("{} stage failed: {}", style(stage).red().bold(), error)
        }
    }
}

/// Print the human-readable summary of a run
pub fn display_run_report(report: &RunReport) {
    println!("\n{}", style("Stages:").bold());
    for (kind, status) in &report.stages {
        println!("  {:<9} {}", kind.name(), format_stage_status(status));
    }

    if let Some(decision) = &report.decision {
        println!("\n{} {}", style("Version:").bold(), format_decision(decision));
    }
    if let Some(state) = &report.tag_state {
        println!("{} {}", style("Tag state:").bold(), state);
    }
    if let Some(coverage) = &report.coverage_report {
        println!("{} {}", style("Coverage report:").bold(), coverage.display());
    }

    for warning in &report.warnings {
        eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
    }

    println!();
    match &report.outcome {
        RunOutcome::Failed { .. } => display_error(&format_outcome(&report.outcome)),
        RunOutcome::Released { .. } => display_success(&format_outcome(&report.outcome)),
        RunOutcome::NoRelease { .. } => display_status(&format_outcome(&report.outcome)),
    }
}
