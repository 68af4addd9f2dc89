//! Download engine
//!
//! This module contains the core download logic, including:
//! - The deduplicating, depth-first frontier
//! - Adaptive per-domain timeouts
//! - HTTP fetching with bounded connection retries
//! - Single-item download tasks
//! - Sequential and bounded-concurrency scheduling
//! - Overall run coordination

mod context;
mod coordinator;
mod fetcher;
mod frontier;
mod scheduler;
mod task;
mod timeouts;

pub use context::{DownloadContext, TaskContext};
pub use coordinator::{load_seed_file, run_download, Coordinator};
pub use fetcher::{
    build_http_client, download_file, get_page, is_html_content_type, map_reqwest_error,
    retry_on_connect, AttemptError, HttpClients,
};
pub use frontier::{BoundItem, Frontier, FrontierError, WorkItem};
pub use scheduler::{ScheduleMode, Scheduler};
pub use task::{FetchTask, TaskOutcome, TaskReport};
pub use timeouts::{TimeoutPolicy, UrlTimeouts};
