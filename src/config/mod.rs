//! Configuration module for Site-Downloader
//!
//! Settings are read from an optional TOML file. Every section and key has a
//! default, so an empty file (or no file at all) yields a working setup.
//!
//! # Example
//!
//! ```no_run
//! use site_downloader::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("settings.toml")).unwrap();
//! println!("Using up to {} workers", config.downloader.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DownloaderConfig, TimeoutConfig, VBulletinConfig, DEFAULT_USER_AGENT,
    MAX_WORKER_THREADS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
