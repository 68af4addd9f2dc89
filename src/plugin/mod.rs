//! Plugin contract for content-extraction collaborators
//!
//! The download engine knows nothing about page structure. For every seed URL
//! it asks each registered plugin how relevant it is, hands the URL to the best
//! one, and from then on routes the items that plugin discovers back to it.
//!
//! # Components
//!
//! - `Plugin`: the trait every collaborator implements
//! - `PluginRegistry`: registration order and relevance-based selection
//! - `VBulletinPlugin`: downloads vBulletin forum threads with their images and stylesheets

mod registry;
mod vbulletin;

pub use registry::PluginRegistry;
pub use vbulletin::VBulletinPlugin;

use crate::config::Config;
use crate::crawler::{BoundItem, TaskContext, WorkItem};
use crate::{SetupError, TaskResult};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use std::path::PathBuf;

/// Highest relevance a plugin can report
pub const MAX_RELEVANCE: u8 = 100;

/// Credentials a plugin wants attached to requests for a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl Credentials {
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// What a plugin returns after processing a bound page item
///
/// `content` and `save_path` go together: either both are set and the content
/// is written to `save_path` (relative to the download root), or neither is.
#[derive(Debug, Clone, Default)]
pub struct Processed {
    pub discovered: Vec<WorkItem>,
    pub content: Option<String>,
    pub save_path: Option<PathBuf>,
}

impl Processed {
    /// Discovered items only, nothing to save
    pub fn discovered(items: Vec<WorkItem>) -> Self {
        Self {
            discovered: items,
            ..Self::default()
        }
    }

    /// Discovered items plus content to save at `save_path`
    pub fn with_content(
        items: Vec<WorkItem>,
        content: impl Into<String>,
        save_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            discovered: items,
            content: Some(content.into()),
            save_path: Some(save_path.into()),
        }
    }
}

/// A content-extraction collaborator
///
/// Implementations are shared between concurrently running tasks and must not
/// rely on being called in any particular order.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name, used for logging and to route bound items back to their owner
    fn name(&self) -> &str;

    /// How well this plugin can handle `url`, from 0 (not at all) to 100
    fn relevance(&self, url: &str) -> u8;

    /// Inspects a seed URL and returns the first batch of work for it
    async fn process_seed(&self, url: &str, ctx: &TaskContext) -> TaskResult<Vec<WorkItem>>;

    /// Fetches a bound page item, extracts further references and optionally
    /// returns rewritten content to save
    async fn process_item(&self, item: &BoundItem, ctx: &TaskContext) -> TaskResult<Processed>;

    /// Credentials to attach to requests for `url`
    fn credentials(&self, _url: &str) -> Option<Credentials> {
        None
    }

    /// Cosmetic grouping for files saved from `url`
    fn category(&self, _url: &str, _content: &str) -> String {
        String::new()
    }
}

/// Builds the registry of plugins shipped with this crate
pub fn default_registry(config: &Config) -> Result<PluginRegistry, SetupError> {
    let mut registry = PluginRegistry::new();
    registry.register(VBulletinPlugin::from_config(&config.vbulletin))?;
    Ok(registry)
}
