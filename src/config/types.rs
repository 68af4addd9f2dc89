use serde::Deserialize;
use std::time::Duration;

/// Default number of concurrent download tasks
pub const MAX_WORKER_THREADS: usize = 10;

/// User agent sent when the settings file doesn't provide one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/51.0.2704.103 Safari/537.36";

/// Main configuration structure for Site-Downloader
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub downloader: DownloaderConfig,
    pub timeouts: TimeoutConfig,
    pub vbulletin: VBulletinConfig,
}

/// Scheduling and identification settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DownloaderConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Maximum number of download tasks running at once
    pub max_workers: usize,

    /// Run one task at a time, in frontier order
    pub single_thread: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_workers: MAX_WORKER_THREADS,
            single_thread: false,
        }
    }
}

/// Network timeout settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutConfig {
    /// Default connect timeout, in seconds
    pub connect_secs: u64,

    /// Default read timeout, in seconds
    pub read_secs: u64,

    /// Number of attempts made before a connection failure is final
    pub connect_attempts: u32,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            read_secs: 10,
            connect_attempts: 3,
        }
    }
}

/// Settings for the vBulletin thread plugin
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VBulletinConfig {
    /// Download images and stylesheets referenced by each page
    pub download_assets: bool,

    /// Point references in saved pages at the downloaded copies
    pub rewrite_paths: bool,
}

impl Default for VBulletinConfig {
    fn default() -> Self {
        Self {
            download_assets: true,
            rewrite_paths: true,
        }
    }
}
