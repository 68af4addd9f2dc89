//! Output module for reporting download results
//!
//! This module handles:
//! - Deduplicated logging and grouping of failed URLs
//! - Run counters and the end-of-run summary

mod report;
mod summary;

pub use report::FailureReport;
pub use summary::{print_summary, RunSummary};
