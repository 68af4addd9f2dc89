//! Deduplicating work queue
//!
//! The frontier holds everything still waiting to be downloaded. It is owned by
//! the scheduler and only ever mutated from the orchestrating task, so it needs
//! no locking.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by frontier operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontierError {
    #[error("Frontier is empty")]
    Empty,
}

/// A fetch target already assigned to the plugin that discovered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundItem {
    /// Registered name of the plugin that owns this item
    pub owner: String,

    /// Cosmetic grouping used in log output and filenames (may be empty)
    pub category: String,

    /// Human-readable label used in log output
    pub display_name: String,

    /// The URL to fetch
    pub url: String,

    /// Target path, relative to the download root
    pub save_path: PathBuf,

    /// Save the response body as-is instead of handing it to the plugin
    pub is_file: bool,
}

impl BoundItem {
    /// Creates a plain file download owned by `owner`
    pub fn file(owner: &str, url: impl Into<String>, save_path: impl Into<PathBuf>) -> Self {
        let url = url.into();
        let save_path = save_path.into();
        let display_name = save_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            owner: owner.to_string(),
            category: String::new(),
            display_name,
            url,
            save_path,
            is_file: true,
        }
    }

    /// Creates a page item owned by `owner`, to be processed by that plugin
    pub fn page(owner: &str, url: impl Into<String>, save_path: impl Into<PathBuf>) -> Self {
        Self {
            is_file: false,
            ..Self::file(owner, url, save_path)
        }
    }
}

/// A unit of frontier state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A URL from the seed list; the plugin is chosen by relevance at dispatch
    Seed(String),

    /// A fully specified fetch target produced by a plugin
    Bound(BoundItem),
}

impl WorkItem {
    /// The URL this item points at
    pub fn url(&self) -> &str {
        match self {
            Self::Seed(url) => url,
            Self::Bound(item) => &item.url,
        }
    }

    /// The deduplication key: a seed and a bound item with the same URL are the
    /// same resource
    pub fn key(&self) -> &str {
        self.url()
    }

    /// Returns true for seed URLs
    pub fn is_seed(&self) -> bool {
        matches!(self, Self::Seed(_))
    }
}

impl From<BoundItem> for WorkItem {
    fn from(item: BoundItem) -> Self {
        Self::Bound(item)
    }
}

/// Deduplicating, depth-first queue of pending work items
///
/// Every key is accepted at most once for the lifetime of the frontier: once
/// an item has been queued, later items with the same key are dropped, even
/// after the original has been popped. Nothing is ever re-fetched.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<WorkItem>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of items ahead of the existing backlog
    ///
    /// The batch keeps its own order, so a page's discovered assets are fetched
    /// before returning to older work. Items whose key was already seen, either
    /// earlier in the run or earlier in this batch, are dropped.
    ///
    /// # Returns
    ///
    /// The number of items actually queued
    pub fn add<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let fresh: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| self.seen.insert(item.key().to_string()))
            .collect();

        let added = fresh.len();
        for item in fresh.into_iter().rev() {
            self.pending.push_front(item);
        }
        added
    }

    /// Removes and returns the item at the head of the queue
    pub fn pop(&mut self) -> Result<WorkItem, FrontierError> {
        self.pending.pop_front().ok_or(FrontierError::Empty)
    }

    /// Returns true if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct keys accepted so far, including dispatched ones
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if the key has ever been accepted
    pub fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }
}
