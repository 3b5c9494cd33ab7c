use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "course")]
    pub courses: Vec<CourseEntry>,
}

impl Config {
    /// Builds the read-only course catalog from the `[[course]]` tables
    pub fn catalog(&self) -> CourseCatalog {
        CourseCatalog::new(self.courses.clone())
    }
}

/// Extraction behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum number of case pages scraped at the same time
    #[serde(rename = "max-concurrent-jobs", default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,

    /// Number of finished work items between checkpoint snapshots
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,

    /// How many times the full resolution strategy list is tried
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between resolution attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Bounded wait for a located element to become visible (milliseconds)
    #[serde(rename = "visibility-timeout-ms", default = "default_visibility_timeout_ms")]
    pub visibility_timeout_ms: u64,

    /// Upper bound on a single navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

impl ExtractionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            checkpoint_interval: default_checkpoint_interval(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            visibility_timeout_ms: default_visibility_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

fn default_max_concurrent_jobs() -> u32 {
    15
}

fn default_checkpoint_interval() -> u32 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_visibility_timeout_ms() -> u64 {
    5000
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

/// Browsing session configuration
///
/// The session is authenticated outside of this crate; all the harvester
/// needs is the cookie that proves it.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Name of the environment variable holding the session cookie header
    #[serde(rename = "cookie-env", default)]
    pub cookie_env: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            cookie_env: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("case-harvester/{}", env!("CARGO_PKG_VERSION"))
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the input rows and written cells
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,
}

/// One course and the repository page that lists its cases
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseEntry {
    pub name: String,
    pub url: String,
}

/// Static mapping of course name to repository URL
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    entries: Vec<CourseEntry>,
}

impl CourseCatalog {
    pub fn new(entries: Vec<CourseEntry>) -> Self {
        Self { entries }
    }

    /// Finds the repository URL for a course cell
    ///
    /// Course cells often carry the full course title ("Geriatrics Medicine
    /// Clerkship") while the catalog is keyed by its first word, so the exact
    /// trimmed name is tried first and the first word second.
    pub fn lookup(&self, course: &str) -> Option<&str> {
        let trimmed = course.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.find(trimmed).or_else(|| {
            trimmed
                .split_whitespace()
                .next()
                .and_then(|first| self.find(first))
        })
    }

    fn find(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.url.as_str())
    }

    pub fn entries(&self) -> &[CourseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CourseCatalog {
        CourseCatalog::new(vec![
            CourseEntry {
                name: "Geriatrics".to_string(),
                url: "https://repo.example.org/document_sets/4886".to_string(),
            },
            CourseEntry {
                name: "Trauma-Informed".to_string(),
                url: "https://repo.example.org/document_sets/34397".to_string(),
            },
        ])
    }

    #[test]
    fn test_lookup_exact_name() {
        assert_eq!(
            catalog().lookup("Geriatrics"),
            Some("https://repo.example.org/document_sets/4886")
        );
    }

    #[test]
    fn test_lookup_uses_first_word() {
        assert_eq!(
            catalog().lookup("  Trauma-Informed Care Elective "),
            Some("https://repo.example.org/document_sets/34397")
        );
    }

    #[test]
    fn test_lookup_unknown_course() {
        assert_eq!(catalog().lookup("Radiology"), None);
        assert_eq!(catalog().lookup("   "), None);
    }

    #[test]
    fn test_extraction_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.max_concurrent_jobs, 15);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }
}
