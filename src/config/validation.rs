use crate::config::types::{Config, DownloaderConfig, TimeoutConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_downloader_config(&config.downloader)?;
    validate_timeout_config(&config.timeouts)?;
    Ok(())
}

fn validate_downloader_config(config: &DownloaderConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    Ok(())
}

fn validate_timeout_config(config: &TimeoutConfig) -> Result<(), ConfigError> {
    if config.connect_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-secs must be >= 1, got {}",
            config.connect_secs
        )));
    }

    if config.read_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "read-secs must be >= 1, got {}",
            config.read_secs
        )));
    }

    if config.connect_attempts < 1 || config.connect_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "connect-attempts must be between 1 and 10, got {}",
            config.connect_attempts
        )));
    }

    Ok(())
}
