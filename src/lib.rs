pub mod analyzer;
pub mod boundary;
pub mod cli;
pub mod config;
pub mod conventional;
pub mod domain;
pub mod error;
pub mod git;
pub mod hosting;
pub mod notify;
pub mod reasoning;
pub mod release;
pub mod report;
pub mod stages;
pub mod ui;

pub use error::{ReleaseError, Result};
