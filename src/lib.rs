//! Site-Downloader: an offline mirror builder
//!
//! This crate fetches pages and the assets they reference starting from a list of
//! seed URLs, hands each URL to the content-extraction plugin best suited to it,
//! and saves the results under a root directory so they can be browsed offline.

pub mod config;
pub mod crawler;
pub mod output;
pub mod plugin;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Site-Downloader operations
///
/// Anything that reaches this type stops the run. Per-item failures are
/// carried as [`TaskError`] and never abort the run on their own.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Logic error for {url}: {message}")]
    Logic { url: String, message: String },

    #[error("Download task panicked: {message}")]
    TaskPanicked { message: String },

    #[error("Frontier error: {0}")]
    Frontier(#[from] crate::crawler::FrontierError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors detected before any download starts
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid root dir: \"{}\"", .0.display())]
    RootDir(PathBuf),

    #[error("URL list file doesn't exist: \"{}\"", .0.display())]
    UrlFile(PathBuf),

    #[error("Couldn't read URL list file \"{}\": {source}", .path.display())]
    ReadUrlFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't find any plugins to load")]
    NoPlugins,

    #[error("Plugin name registered twice: {0}")]
    DuplicatePlugin(String),
}

/// Classification of a failed download task
///
/// Used for log grouping and for the end-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    HttpConnect,
    HttpRequest,
    PageDetails,
    FileExists,
    Write,
    DelayedWrite,
    PathConflict,
    Logic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HttpConnect => "HTTP connect error",
            Self::HttpRequest => "HTTP request error",
            Self::PageDetails => "page details error",
            Self::FileExists => "file exists",
            Self::Write => "write error",
            Self::DelayedWrite => "delayed write error",
            Self::PathConflict => "path conflict",
            Self::Logic => "logic error",
        };
        write!(f, "{}", s)
    }
}

/// Error produced by a single download task or by a plugin working on its behalf
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Connection failed: {0}")]
    HttpConnect(String),

    #[error("Request failed: {0}")]
    HttpRequest(String),

    #[error("Problem when parsing page: {0}")]
    PageDetails(String),

    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("Unable to create file {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    /// The OS reported the target as missing while creating it, which happens
    /// on delayed-write failures and over-long paths.
    #[error("Failed to download file, unable to create {}", .0.display())]
    DelayedWrite(PathBuf),

    #[error("Save path {} collides with an existing {existing}", .path.display())]
    PathConflict { path: PathBuf, existing: String },

    #[error("{0}")]
    Logic(String),
}

impl TaskError {
    /// Returns the classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HttpConnect(_) => ErrorKind::HttpConnect,
            Self::HttpRequest(_) => ErrorKind::HttpRequest,
            Self::PageDetails(_) => ErrorKind::PageDetails,
            Self::FileExists(_) => ErrorKind::FileExists,
            Self::Write { .. } => ErrorKind::Write,
            Self::DelayedWrite(_) => ErrorKind::DelayedWrite,
            Self::PathConflict { .. } => ErrorKind::PathConflict,
            Self::Logic(_) => ErrorKind::Logic,
        }
    }

    /// Returns true if this error signals a programming defect and must end the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Logic(_))
    }
}

/// Result type alias for Site-Downloader operations
pub type Result<T> = std::result::Result<T, DownloadError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for a single download task
pub type TaskResult<T> = std::result::Result<T, TaskError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, Frontier, Scheduler, TimeoutPolicy, WorkItem};
pub use plugin::{Plugin, PluginRegistry};
pub use state::{DomainFailureCounters, TaskPhase};
pub use url::{domain_key, usable_filename};
