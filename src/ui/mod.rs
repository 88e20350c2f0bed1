//! Terminal output for the CLI.
//!
//! The pipeline is non-interactive; everything here only prints.

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_run_report, display_status,
    display_success, format_decision, format_outcome, format_stage_status,
};
