use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub(crate) fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored in every checkpoint so a resumed run can tell whether
/// the catalog it is resuming against has changed.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID: &str = r#"
[extraction]
max-concurrent-jobs = 4
checkpoint-interval = 25
retry-attempts = 2
retry-delay-ms = 250
visibility-timeout-ms = 2000
navigation-timeout-ms = 10000

[session]
user-agent = "TestHarvester/1.0"
cookie-env = "TEST_COOKIE"

[output]
database-path = "./test.db"
checkpoint-path = "./checkpoint.json"

[[course]]
name = "Geriatrics"
url = "https://repo.example.org/document_sets/4886"

[[course]]
name = "Radiology"
url = "https://repo.example.org/document_sets/4890"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.extraction.max_concurrent_jobs, 4);
        assert_eq!(config.extraction.checkpoint_interval, 25);
        assert_eq!(config.session.cookie_env.as_deref(), Some("TEST_COOKIE"));
        assert_eq!(config.courses.len(), 2);
        assert_eq!(
            config.catalog().lookup("Radiology"),
            Some("https://repo.example.org/document_sets/4890")
        );
    }

    #[test]
    fn test_extraction_defaults_applied() {
        let config = parse_config(
            r#"
[extraction]

[output]
database-path = "./test.db"
checkpoint-path = "./checkpoint.json"
"#,
        )
        .unwrap();

        assert_eq!(config.extraction.max_concurrent_jobs, 15);
        assert_eq!(config.extraction.checkpoint_interval, 10);
        assert!(config.session.user_agent.starts_with("case-harvester/"));
        assert!(config.courses.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID.replace("max-concurrent-jobs = 4", "max-concurrent-jobs = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_hash_is_stable() {
        let file = create_temp_config(VALID);
        let (_, hash1) = load_config_with_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
