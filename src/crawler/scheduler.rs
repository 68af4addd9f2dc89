//! Scheduler for draining the frontier
//!
//! This module handles:
//! - Dispatching work items as download tasks
//! - Global concurrency limiting via a semaphore
//! - Merging task results back into the frontier
//! - Folding connect failures into the timeout policy
//!
//! The scheduler is the single owner of the frontier, the timeout policy and
//! the run summary. Tasks only ever see an immutable policy snapshot and hand
//! their results back through the `JoinSet`.

use crate::config::DownloaderConfig;
use crate::crawler::context::{DownloadContext, TaskContext};
use crate::crawler::frontier::{Frontier, WorkItem};
use crate::crawler::task::{FetchTask, TaskOutcome, TaskReport};
use crate::crawler::timeouts::TimeoutPolicy;
use crate::output::RunSummary;
use crate::{DownloadError, TaskError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How tasks are run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// One task at a time, in frontier order
    Sequential,

    /// Up to `max_workers` tasks at once
    Bounded { max_workers: usize },
}

impl ScheduleMode {
    pub fn from_config(config: &DownloaderConfig) -> Self {
        if config.single_thread {
            Self::Sequential
        } else {
            Self::Bounded {
                max_workers: config.max_workers,
            }
        }
    }
}

/// Runs download tasks until the frontier is exhausted
///
/// The run ends when the frontier is empty and no task is in flight, or as
/// soon as a task reports a fatal error.
pub struct Scheduler {
    frontier: Frontier,
    policy: Arc<TimeoutPolicy>,
    context: Arc<DownloadContext>,
    mode: ScheduleMode,
    summary: RunSummary,
}

impl Scheduler {
    /// Creates a new scheduler with an empty frontier
    pub fn new(context: Arc<DownloadContext>, policy: TimeoutPolicy, mode: ScheduleMode) -> Self {
        Self {
            frontier: Frontier::new(),
            policy: Arc::new(policy),
            context,
            mode,
            summary: RunSummary::new(),
        }
    }

    /// Queues items ahead of the existing backlog
    ///
    /// # Returns
    ///
    /// The number of items actually queued after deduplication
    pub fn add_items<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = WorkItem>,
    {
        self.frontier.add(items)
    }

    /// Number of items waiting to be dispatched
    pub fn pending(&self) -> usize {
        self.frontier.len()
    }

    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// The current timeout policy, including all merged failures
    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }

    /// Runs until the frontier is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - All items were dispatched and every task finished
    /// * `Err(DownloadError)` - A task hit a logic error or panicked
    pub async fn run(mut self) -> Result<RunSummary, DownloadError> {
        tracing::info!(
            "Starting download of {} queued items ({:?})",
            self.frontier.len(),
            self.mode
        );

        match self.mode {
            ScheduleMode::Sequential => self.run_sequential().await?,
            ScheduleMode::Bounded { max_workers } => self.run_bounded(max_workers).await?,
        }

        self.summary.finish(self.policy.failures());
        tracing::info!(
            "Download finished: {} succeeded, {} failed",
            self.summary.succeeded,
            self.summary.failed
        );
        Ok(self.summary)
    }

    async fn run_sequential(&mut self) -> Result<(), DownloadError> {
        while !self.frontier.is_empty() {
            let item = self.frontier.pop()?;
            let report = self.dispatch(item).run().await;
            self.merge(report)?;
        }
        Ok(())
    }

    async fn run_bounded(&mut self, max_workers: usize) -> Result<(), DownloadError> {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut in_flight: JoinSet<TaskReport> = JoinSet::new();

        loop {
            while !self.frontier.is_empty() {
                let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                    break;
                };
                let item = self.frontier.pop()?;
                let task = self.dispatch(item);
                in_flight.spawn(async move {
                    let report = task.run().await;
                    drop(permit);
                    report
                });
            }

            match in_flight.join_next().await {
                Some(Ok(report)) => self.merge(report)?,
                Some(Err(err)) => {
                    tracing::error!("Download task died: {}", err);
                    return Err(DownloadError::TaskPanicked {
                        message: err.to_string(),
                    });
                }
                None => break,
            }
        }

        Ok(())
    }

    /// Wraps an item in a task with a snapshot of the current policy
    fn dispatch(&mut self, item: WorkItem) -> FetchTask {
        self.summary.dispatched += 1;
        let ctx = TaskContext::new(Arc::clone(&self.context), Arc::clone(&self.policy));
        FetchTask::new(item, ctx)
    }

    /// Folds a finished task back into the scheduler state
    fn merge(&mut self, report: TaskReport) -> Result<(), DownloadError> {
        let TaskReport {
            item,
            outcome,
            connect_failures,
            phase,
        } = report;
        tracing::trace!("Task for {} ended {}", item.url(), phase);

        if !connect_failures.is_empty() {
            Arc::make_mut(&mut self.policy).record_failures(&connect_failures);
        }

        match outcome {
            TaskOutcome::Success {
                discovered,
                skipped,
            } => {
                self.summary.succeeded += 1;
                if skipped {
                    self.summary.skipped += 1;
                }

                let found = discovered.len();
                let added = self.frontier.add(discovered);
                self.summary.discovered += added as u64;
                if found > 0 {
                    tracing::debug!("{}: found {} items, {} new", item.url(), found, added);
                }
            }
            TaskOutcome::Failure(err) if err.is_fatal() => {
                tracing::error!("Stopping download, {} failed: {}", item.url(), err);
                return Err(DownloadError::Logic {
                    url: item.url().to_string(),
                    message: err.to_string(),
                });
            }
            TaskOutcome::Failure(TaskError::FileExists(path)) => {
                tracing::info!("File already exists, skipping: {}", path.display());
                self.summary.succeeded += 1;
                self.summary.skipped += 1;
            }
            TaskOutcome::Failure(err) => {
                self.summary.failed += 1;
                self.summary.failures.record(&item, &err);
            }
        }

        Ok(())
    }
}
