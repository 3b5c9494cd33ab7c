use crate::config::types::{Config, CourseEntry, ExtractionConfig, OutputConfig, SessionConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_extraction_config(&config.extraction)?;
    validate_session_config(&config.session)?;
    validate_output_config(&config.output)?;
    validate_courses(&config.courses)?;
    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_jobs < 1 || config.max_concurrent_jobs > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_jobs must be between 1 and 100, got {}",
            config.max_concurrent_jobs
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if config.retry_attempts < 1 || config.retry_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be between 1 and 10, got {}",
            config.retry_attempts
        )));
    }

    if config.visibility_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "visibility_timeout_ms must be >= 100ms, got {}ms",
            config.visibility_timeout_ms
        )));
    }

    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(name) = &config.cookie_env {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Validation(format!(
                "cookie_env must be a valid environment variable name, got '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the course catalog entries
fn validate_courses(courses: &[CourseEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in courses {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "course name cannot be empty".to_string(),
            ));
        }

        if entry.name.trim() != entry.name {
            return Err(ConfigError::Validation(format!(
                "course name '{}' has surrounding whitespace",
                entry.name
            )));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "course '{}' is listed more than once",
                entry.name
            )));
        }

        let url = Url::parse(&entry.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL for course '{}': {}", entry.name, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "URL for course '{}' must use http or https, got '{}'",
                entry.name,
                url.scheme()
            )));
        }
    }

    Ok(())
}
