//! Failure bookkeeping for a download run

use crate::crawler::WorkItem;
use crate::url::is_image_url;
use crate::{ErrorKind, TaskError};
use std::collections::{HashMap, HashSet};

/// Failed URLs collected over a run, grouped the way they are reported
///
/// Each URL is logged and counted once, however many times it fails.
#[derive(Debug, Clone, Default)]
pub struct FailureReport {
    logged: HashSet<String>,
    failed_images: Vec<String>,
    failed_pages: Vec<String>,
    failed_urls: Vec<String>,
    by_kind: HashMap<ErrorKind, u64>,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed item and logs it
    ///
    /// # Returns
    ///
    /// `false` if this URL had already been recorded, in which case nothing
    /// is logged or counted
    pub fn record(&mut self, item: &WorkItem, error: &TaskError) -> bool {
        let url = item.url();
        if !self.logged.insert(url.to_string()) {
            return false;
        }

        match error.kind() {
            ErrorKind::HttpConnect => tracing::warn!("Couldn't connect to {}: {}", url, error),
            ErrorKind::HttpRequest => tracing::warn!("Request for {} failed: {}", url, error),
            ErrorKind::PageDetails => tracing::warn!("Couldn't process page {}: {}", url, error),
            _ => tracing::error!("Failed to save {}: {}", url, error),
        }

        *self.by_kind.entry(error.kind()).or_insert(0) += 1;

        if is_image_url(url) {
            self.failed_images.push(url.to_string());
        } else if is_page(item) {
            self.failed_pages.push(url.to_string());
        } else {
            self.failed_urls.push(url.to_string());
        }
        true
    }

    pub fn failed_images(&self) -> &[String] {
        &self.failed_images
    }

    pub fn failed_pages(&self) -> &[String] {
        &self.failed_pages
    }

    /// Failed URLs that are neither images nor pages
    pub fn failed_urls(&self) -> &[String] {
        &self.failed_urls
    }

    /// Number of distinct URLs that failed with `kind`
    pub fn count(&self, kind: ErrorKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn by_kind(&self) -> &HashMap<ErrorKind, u64> {
        &self.by_kind
    }

    /// Number of distinct failed URLs
    pub fn total(&self) -> usize {
        self.logged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logged.is_empty()
    }
}

fn is_page(item: &WorkItem) -> bool {
    match item {
        WorkItem::Seed(_) => true,
        WorkItem::Bound(bound) => !bound.is_file,
    }
}
