//! One dispatch/execute/persist cycle for a single work item

use crate::crawler::context::TaskContext;
use crate::crawler::frontier::{BoundItem, WorkItem};
use crate::plugin::{Plugin, Processed};
use crate::state::{DomainFailureCounters, TaskPhase};
use crate::storage::{self, PersistOutcome};
use crate::{TaskError, TaskResult};

/// How a task ended
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The item was handled. `skipped` is set when the target already existed
    /// and nothing was written.
    Success {
        discovered: Vec<WorkItem>,
        skipped: bool,
    },

    /// The item failed with a classified error
    Failure(TaskError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Everything the scheduler needs from a finished task
#[derive(Debug)]
pub struct TaskReport {
    pub item: WorkItem,
    pub outcome: TaskOutcome,

    /// Terminal phase: `Succeeded` or `Failed`
    pub phase: TaskPhase,

    /// Connect failures recorded while the task ran, by domain
    pub connect_failures: DomainFailureCounters,
}

/// A single download task
///
/// Seeds are routed to the most relevant plugin; bound items go back to the
/// plugin that produced them. The task never touches the frontier or the
/// shared timeout policy: it reports what it found and the scheduler merges it.
#[derive(Debug)]
pub struct FetchTask {
    item: WorkItem,
    ctx: TaskContext,
    phase: TaskPhase,
}

impl FetchTask {
    pub fn new(item: WorkItem, ctx: TaskContext) -> Self {
        Self {
            item,
            ctx,
            phase: TaskPhase::Dispatching,
        }
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Runs the task to completion
    ///
    /// Never fails: errors are returned inside the report.
    pub async fn run(self) -> TaskReport {
        let Self {
            item,
            ctx,
            mut phase,
        } = self;

        let outcome = match execute(&item, &ctx, &mut phase).await {
            Ok((discovered, skipped)) => match advance(&mut phase, TaskPhase::Succeeded) {
                Ok(()) => TaskOutcome::Success {
                    discovered,
                    skipped,
                },
                Err(err) => fail(&mut phase, err),
            },
            Err(err) => {
                tracing::trace!("Task for {} failed in phase {}", item.url(), phase);
                fail(&mut phase, err)
            }
        };

        TaskReport {
            connect_failures: ctx.take_failures(),
            item,
            outcome,
            phase,
        }
    }
}

fn fail(phase: &mut TaskPhase, err: TaskError) -> TaskOutcome {
    if !phase.is_terminal() {
        *phase = TaskPhase::Failed;
    }
    TaskOutcome::Failure(err)
}

fn advance(phase: &mut TaskPhase, next: TaskPhase) -> TaskResult<()> {
    if !phase.can_transition_to(next) {
        return Err(TaskError::Logic(format!(
            "Invalid task transition from {} to {}",
            phase, next
        )));
    }
    *phase = next;
    Ok(())
}

async fn execute(
    item: &WorkItem,
    ctx: &TaskContext,
    phase: &mut TaskPhase,
) -> TaskResult<(Vec<WorkItem>, bool)> {
    match item {
        WorkItem::Seed(url) => {
            advance(phase, TaskPhase::PluginSelection)?;
            let plugin = ctx
                .shared()
                .plugins()
                .select(url)
                .ok_or_else(|| TaskError::PageDetails(format!("No plugin to process URL {}", url)))?;

            tracing::info!("Processing {} with {}", url, plugin.name());
            advance(phase, TaskPhase::Executing)?;
            let discovered = plugin.process_seed(url, ctx).await?;
            Ok((discovered, false))
        }
        WorkItem::Bound(bound) => {
            let plugin = ctx.shared().plugins().get(&bound.owner).ok_or_else(|| {
                TaskError::Logic(format!(
                    "Item {} is owned by unknown plugin {}",
                    bound.url, bound.owner
                ))
            })?;

            advance(phase, TaskPhase::Executing)?;
            if bound.is_file {
                download(bound, plugin.as_ref(), ctx).await
            } else {
                tracing::info!("Processing {} ({})", bound.display_name, bound.url);
                let processed = plugin.process_item(bound, ctx).await?;
                persist(processed, ctx, phase).await
            }
        }
    }
}

async fn download(
    item: &BoundItem,
    plugin: &dyn Plugin,
    ctx: &TaskContext,
) -> TaskResult<(Vec<WorkItem>, bool)> {
    let path = storage::resolve_save_path(ctx.root(), &item.save_path)?;
    let credentials = plugin.credentials(&item.url);

    match ctx.download_file(&item.url, &path, credentials.as_ref()).await {
        Ok(_) => Ok((Vec::new(), false)),
        Err(TaskError::FileExists(path)) => {
            tracing::info!("File already exists, skipping: {}", path.display());
            Ok((Vec::new(), true))
        }
        Err(err) => Err(err),
    }
}

async fn persist(
    processed: Processed,
    ctx: &TaskContext,
    phase: &mut TaskPhase,
) -> TaskResult<(Vec<WorkItem>, bool)> {
    let Processed {
        discovered,
        content,
        save_path,
    } = processed;

    match (content, save_path) {
        (Some(content), Some(save_path)) => {
            advance(phase, TaskPhase::Persisting)?;
            let path = storage::resolve_save_path(ctx.root(), &save_path)?;
            match storage::write_page(&path, &content).await? {
                PersistOutcome::Written => {
                    tracing::debug!("Saved {}", path.display());
                    Ok((discovered, false))
                }
                PersistOutcome::AlreadyExists => {
                    tracing::info!("File already exists, not overwriting: {}", path.display());
                    Ok((discovered, true))
                }
            }
        }
        (None, None) => Ok((discovered, false)),
        (Some(_), None) => Err(TaskError::Logic(
            "Plugin returned content without a save path".to_string(),
        )),
        (None, Some(path)) => Err(TaskError::Logic(format!(
            "Plugin returned save path {} without content",
            path.display()
        ))),
    }
}
