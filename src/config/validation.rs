use crate::config::types::{BrowserConfig, Config, OutputConfig, RemoteConfig, SyncConfig};
use crate::sync::pacing::MAX_PACE_SECS;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_browser_config(&config.browser)?;
    validate_sync_config(&config.sync)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    validate_http_url("webdriver_url", &config.webdriver_url)?;

    if config.login_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "login_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.extraction_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "extraction_timeout_secs must be > 0".to_string(),
        ));
    }

    if scraper::Selector::parse(&config.ready_selector).is_err() {
        return Err(ConfigError::Validation(format!(
            "ready_selector is not a valid CSS selector: '{}'",
            config.ready_selector
        )));
    }

    Ok(())
}

fn validate_sync_config(config: &SyncConfig) -> Result<(), ConfigError> {
    if !config.min_pace_secs.is_finite() || config.min_pace_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "min_pace_secs must be >= 0, got {}",
            config.min_pace_secs
        )));
    }

    if !config.max_pace_secs.is_finite() || config.max_pace_secs < config.min_pace_secs {
        return Err(ConfigError::Validation(format!(
            "max_pace_secs must be >= min_pace_secs ({}), got {}",
            config.min_pace_secs, config.max_pace_secs
        )));
    }

    if config.max_pace_secs > MAX_PACE_SECS {
        return Err(ConfigError::Validation(format!(
            "max_pace_secs must be <= {}, got {}",
            MAX_PACE_SECS, config.max_pace_secs
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("database_path", &config.database_path),
        ("credentials_path", &config.credentials_path),
        ("deck_path", &config.deck_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Checks that a configured endpoint is an absolute http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
