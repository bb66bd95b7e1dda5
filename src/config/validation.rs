use crate::config::types::Config;
use crate::ConfigError;

/// Validates a parsed configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl(config)?;
    validate_gallery(config)?;
    validate_storage(config)?;
    validate_user_agent(config)?;
    validate_platforms(config)?;
    Ok(())
}

fn validate_crawl(config: &Config) -> Result<(), ConfigError> {
    if config.crawl.retry_attempts == 0 {
        return Err(ConfigError::Validation(
            "crawl.retry-attempts must be at least 1".to_string(),
        ));
    }
    if config.crawl.page_size == 0 || config.crawl.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "crawl.page-size must be between 1 and 100, got {}",
            config.crawl.page_size
        )));
    }
    Ok(())
}

fn validate_gallery(config: &Config) -> Result<(), ConfigError> {
    if config.gallery.max_steps == 0 {
        return Err(ConfigError::Validation(
            "gallery.max-steps must be at least 1".to_string(),
        ));
    }
    if config.gallery.max_wall_clock_secs == 0 {
        return Err(ConfigError::Validation(
            "gallery.max-wall-clock-secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ConfigError> {
    if config.storage.progress_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage.progress-dir must not be empty".to_string(),
        ));
    }
    if config.storage.media_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage.media-dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_user_agent(config: &Config) -> Result<(), ConfigError> {
    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name must not be empty".to_string(),
        ));
    }
    if config.user_agent.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-version must not be empty".to_string(),
        ));
    }
    let contact = url::Url::parse(&config.user_agent.contact_url).map_err(|_| {
        ConfigError::Validation("user-agent.contact-url must be a valid URL".to_string())
    })?;
    if contact.scheme() != "http" && contact.scheme() != "https" {
        return Err(ConfigError::Validation(
            "user-agent.contact-url must use http or https".to_string(),
        ));
    }
    Ok(())
}

fn validate_platforms(config: &Config) -> Result<(), ConfigError> {
    for (platform, entry) in &config.platforms {
        let parsed = url::Url::parse(&entry.endpoint).map_err(|_| {
            ConfigError::InvalidEndpoint(format!("{}: {}", platform, entry.endpoint))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{}: {} (must use http or https)",
                platform, entry.endpoint
            )));
        }
        if entry.cursor_param.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "platforms.{}.cursor-param must not be empty",
                platform
            )));
        }
    }
    Ok(())
}
