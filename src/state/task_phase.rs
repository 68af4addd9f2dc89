use std::fmt;

/// Lifecycle phases of a download task
///
/// A task moves strictly forward through these phases. Raw seed URLs go
/// through plugin selection; items already bound to a plugin skip it. Any
/// active phase may end the task early in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    // ===== Active States =====
    /// Task has been created for a work item but not started
    Dispatching,

    /// Choosing the plugin with the highest relevance for a seed URL
    PluginSelection,

    /// Plugin processing or binary download in progress
    Executing,

    /// Writing returned content to disk
    Persisting,

    // ===== Terminal States =====
    /// Task finished, possibly skipping a file that already existed
    Succeeded,

    /// Task finished with a classified error
    Failed,
}

impl TaskPhase {
    /// Returns true if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Checks whether moving from this phase to `next` is allowed
    pub fn can_transition_to(&self, next: TaskPhase) -> bool {
        use TaskPhase::*;

        match (self, next) {
            (Dispatching, PluginSelection) | (Dispatching, Executing) => true,
            (PluginSelection, Executing) => true,
            (Executing, Persisting) | (Executing, Succeeded) => true,
            (Persisting, Succeeded) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dispatching => "dispatching",
            Self::PluginSelection => "plugin_selection",
            Self::Executing => "executing",
            Self::Persisting => "persisting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
