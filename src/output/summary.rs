//! End-of-run summary

use crate::output::FailureReport;
use crate::state::DomainFailureCounters;
use chrono::{DateTime, Utc};

/// Counters and failures for one download run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Tasks handed to a worker
    pub dispatched: u64,

    /// Tasks that ended in success, including skipped ones
    pub succeeded: u64,

    /// Successful tasks that found their target already on disk
    pub skipped: u64,

    /// Tasks that ended in failure
    pub failed: u64,

    /// Items added to the frontier by tasks (after deduplication)
    pub discovered: u64,

    pub failures: FailureReport,

    /// Connect failures per domain at the end of the run
    pub connect_failures: DomainFailureCounters,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    /// Starts a summary clock at the current time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dispatched: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            discovered: 0,
            failures: FailureReport::new(),
            connect_failures: DomainFailureCounters::new(),
        }
    }

    /// Number of tasks that have reported back
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Stops the clock and records the final connect-failure counts
    pub fn finish(&mut self, connect_failures: &DomainFailureCounters) {
        self.finished_at = Some(Utc::now());
        self.connect_failures = connect_failures.clone();
    }

    /// Run duration in seconds, if the run has finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Download Summary ===\n");

    println!("Overview:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    if let Some(seconds) = summary.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  Tasks dispatched: {}", summary.dispatched);
    println!(
        "  Succeeded: {} ({} already on disk)",
        summary.succeeded, summary.skipped
    );
    println!("  Failed: {}", summary.failed);
    println!("  Items discovered: {}", summary.discovered);
    println!();

    let report = &summary.failures;
    if !report.is_empty() {
        println!("Failures by Kind:");
        let mut kinds: Vec<_> = report.by_kind().iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
        println!();

        print_list("Failed pages", report.failed_pages());
        print_list("Failed images", report.failed_images());
        print_list("Other failed URLs", report.failed_urls());
    }

    if !summary.connect_failures.is_empty() {
        println!("Connect Failures by Domain:");
        let mut domains: Vec<_> = summary.connect_failures.iter().collect();
        domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (domain, count) in domains {
            println!("  {}: {}", domain, count);
        }
        println!();
    }

    let success_rate = if summary.dispatched > 0 {
        (summary.succeeded as f64 / summary.dispatched as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} tasks)",
        success_rate, summary.succeeded, summary.dispatched
    );
}

fn print_list(title: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }
    println!("{} ({}):", title, urls.len());
    for url in urls {
        println!("  - {}", url);
    }
    println!();
}
