//! Shared and per-task context
//!
//! `DownloadContext` is built once at startup and never mutated afterwards. It
//! carries the settings every task needs (root directory, user agent, HTTP
//! clients, plugins). `TaskContext` wraps it for one task together with the
//! timeout-policy snapshot taken at dispatch and the task's own connect-failure
//! counters.

use crate::config::Config;
use crate::crawler::fetcher::{self, HttpClients};
use crate::crawler::timeouts::{TimeoutPolicy, UrlTimeouts};
use crate::plugin::{Credentials, PluginRegistry};
use crate::state::DomainFailureCounters;
use crate::url::domain_key;
use crate::TaskResult;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Settings and resources shared by every task in a run
#[derive(Debug)]
pub struct DownloadContext {
    root: PathBuf,
    clients: HttpClients,
    plugins: PluginRegistry,
}

impl DownloadContext {
    /// Builds the shared context
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `root` - Directory all save paths are relative to
    /// * `plugins` - Registered plugins
    pub fn new(
        config: &Config,
        root: impl Into<PathBuf>,
        plugins: PluginRegistry,
    ) -> Result<Self, reqwest::Error> {
        let policy = TimeoutPolicy::from_config(&config.timeouts);
        let clients = HttpClients::new(
            &config.downloader.user_agent,
            &policy.connect_tiers(),
            config.timeouts.read(),
        )?;

        Ok(Self {
            root: root.into(),
            clients,
            plugins,
        })
    }

    /// Directory all save paths are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub(crate) fn clients(&self) -> &HttpClients {
        &self.clients
    }
}

/// Everything a task, and the plugin working for it, may use
///
/// Connect failures recorded here stay local to the task until the scheduler
/// merges them into the shared timeout policy.
#[derive(Debug)]
pub struct TaskContext {
    shared: Arc<DownloadContext>,
    policy: Arc<TimeoutPolicy>,
    failures: Mutex<DomainFailureCounters>,
}

impl TaskContext {
    /// Creates a context for one task
    pub fn new(shared: Arc<DownloadContext>, policy: Arc<TimeoutPolicy>) -> Self {
        Self {
            shared,
            policy,
            failures: Mutex::new(DomainFailureCounters::new()),
        }
    }

    /// Directory all save paths are relative to
    pub fn root(&self) -> &Path {
        self.shared.root()
    }

    pub fn shared(&self) -> &DownloadContext {
        &self.shared
    }

    /// Number of attempts made before a connection failure is final
    pub fn connect_attempts(&self) -> u32 {
        self.policy.connect_attempts()
    }

    /// Timeouts for `url` according to the policy snapshot
    pub fn timeouts_for(&self, url: &str) -> UrlTimeouts {
        self.policy.timeouts_for(url)
    }

    /// HTTP client configured with the timeouts for `url`
    pub fn client_for(&self, url: &str) -> &reqwest::Client {
        self.shared.clients().client_for(self.timeouts_for(url).connect)
    }

    /// Records one connect failure for the domain of `url`
    pub fn record_connect_failure(&self, url: &str) {
        let domain = domain_key(url);
        tracing::debug!("Connect failure for domain {}", domain);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&domain);
    }

    /// Returns the connect failures recorded so far, leaving the counters empty
    pub fn take_failures(&self) -> DomainFailureCounters {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Fetches a page as text
    ///
    /// Up to `connect_attempts` attempts are made. Connection errors and non-200
    /// responses are both retried; once attempts run out a connection error
    /// yields `HttpConnect` and a bad status yields `HttpRequest`.
    pub async fn get_page(&self, url: &str, credentials: Option<&Credentials>) -> TaskResult<String> {
        fetcher::get_page(self, url, credentials).await
    }

    /// Streams a file download to `save_path`
    pub async fn download_file(
        &self,
        url: &str,
        save_path: &Path,
        credentials: Option<&Credentials>,
    ) -> TaskResult<u64> {
        fetcher::download_file(self, url, save_path, credentials).await
    }
}
