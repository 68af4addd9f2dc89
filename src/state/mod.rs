//! State module for tracking download progress
//!
//! # Components
//!
//! - `DomainFailureCounters`: per-domain connect-failure counts feeding the timeout policy
//! - `TaskPhase`: the lifecycle of a single download task

mod failure_counts;
mod task_phase;

// Re-export main types
pub use failure_counts::DomainFailureCounters;
pub use task_phase::TaskPhase;
