use super::{Plugin, MAX_RELEVANCE};
use crate::SetupError;
use std::sync::Arc;

/// Ordered set of registered plugins
///
/// Registration order matters: when two plugins report the same relevance for
/// a URL, the one registered first handles it.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin
    ///
    /// Plugin names must be unique since bound items refer to their owner by name.
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<(), SetupError> {
        self.register_arc(Arc::new(plugin))
    }

    /// Registers an already shared plugin
    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), SetupError> {
        if self.get(plugin.name()).is_some() {
            return Err(SetupError::DuplicatePlugin(plugin.name().to_string()));
        }
        tracing::debug!("Registered plugin {}", plugin.name());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Returns the plugin with the highest relevance for `url`
    ///
    /// Only a strictly higher score replaces the current best, so ties go to
    /// the earliest registered plugin. Returns `None` when every plugin
    /// reports 0.
    pub fn select(&self, url: &str) -> Option<Arc<dyn Plugin>> {
        let mut best: Option<(&Arc<dyn Plugin>, u8)> = None;

        for plugin in &self.plugins {
            let relevance = plugin.relevance(url).min(MAX_RELEVANCE);
            tracing::trace!("Plugin {} relevance for {}: {}", plugin.name(), url, relevance);

            let current = best.map(|(_, score)| score).unwrap_or(0);
            if relevance > current {
                best = Some((plugin, relevance));
            }
        }

        best.map(|(plugin, _)| Arc::clone(plugin))
    }

    /// Looks up a plugin by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name).cloned()
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Names of the registered plugins, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
