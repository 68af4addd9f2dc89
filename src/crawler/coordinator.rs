//! Download coordinator - setup and wiring of a download run
//!
//! This module checks everything that can be checked before the first
//! request goes out:
//! - The download root exists and is a directory
//! - The seed list exists and is readable
//! - At least one plugin is registered
//!
//! It then builds the shared context and hands the seeds to the scheduler.

use crate::config::{self, Config};
use crate::crawler::context::DownloadContext;
use crate::crawler::frontier::WorkItem;
use crate::crawler::scheduler::{ScheduleMode, Scheduler};
use crate::crawler::timeouts::TimeoutPolicy;
use crate::output::RunSummary;
use crate::plugin::PluginRegistry;
use crate::{DownloadError, SetupError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main download coordinator structure
pub struct Coordinator {
    root: PathBuf,
    scheduler: Scheduler,
}

impl Coordinator {
    /// Creates a coordinator for a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The downloader configuration
    /// * `root` - Existing directory that receives all downloads
    /// * `plugins` - Registered plugins, at least one
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to accept seeds
    /// * `Err(DownloadError)` - Setup failed; nothing was fetched
    pub fn new(
        config: &Config,
        root: impl Into<PathBuf>,
        plugins: PluginRegistry,
    ) -> Result<Self, DownloadError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SetupError::RootDir(root).into());
        }
        if plugins.is_empty() {
            return Err(SetupError::NoPlugins.into());
        }
        tracing::info!("Loaded plugins: {}", plugins.names().join(", "));

        let context = DownloadContext::new(config, root.clone(), plugins)?;
        let policy = TimeoutPolicy::from_config(&config.timeouts);
        let mode = ScheduleMode::from_config(&config.downloader);

        Ok(Self {
            root,
            scheduler: Scheduler::new(Arc::new(context), policy, mode),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Queues seed URLs
    ///
    /// # Returns
    ///
    /// The number of seeds queued after deduplication
    pub fn add_seeds<I, S>(&mut self, seeds: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scheduler
            .add_items(seeds.into_iter().map(|url| WorkItem::Seed(url.into())))
    }

    /// Runs the download until every reachable item has been processed
    pub async fn run(self) -> Result<RunSummary, DownloadError> {
        tracing::info!("Saving downloads under {}", self.root.display());
        self.scheduler.run().await
    }
}

/// Reads the seed list: one URL per line, trailing whitespace stripped
///
/// Empty lines are kept; callers decide what to do with them.
pub fn load_seed_file(path: &Path) -> Result<Vec<String>, SetupError> {
    if !path.is_file() {
        return Err(SetupError::UrlFile(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| SetupError::ReadUrlFile {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect())
}

/// Runs a complete download
///
/// This is the main entry point. It will:
/// 1. Validate the configuration
/// 2. Check the root directory and plugins
/// 3. Load the seed list, dropping empty lines
/// 4. Drain the frontier
///
/// # Returns
///
/// * `Ok(RunSummary)` - Download completed; individual items may have failed
/// * `Err(DownloadError)` - Setup failed or a task hit a fatal error
pub async fn run_download(
    config: &Config,
    root: &Path,
    url_file: &Path,
    plugins: PluginRegistry,
) -> Result<RunSummary, DownloadError> {
    config::validate(config)?;

    let mut coordinator = Coordinator::new(config, root, plugins)?;

    let seeds: Vec<String> = load_seed_file(url_file)?
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect();
    let queued = coordinator.add_seeds(seeds);
    tracing::info!("Loaded {} seed URLs from {}", queued, url_file.display());

    coordinator.run().await
}
