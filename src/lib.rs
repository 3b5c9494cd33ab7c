//! case-harvester: resumable extraction of case synopses and teaching points
//!
//! This crate walks the course repositories of an authenticated document
//! site, pulls the synopsis and named teaching-point sections out of each
//! case, and publishes the cleaned text into a tabular store. Work is
//! checkpointed so an interrupted run resumes where the last snapshot left off.

pub mod browser;
pub mod checkpoint;
pub mod config;
pub mod extractor;
pub mod output;
pub mod resolver;
pub mod state;
pub mod storage;
pub mod text;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Could not resolve '{target}' after {attempts} attempts")]
    Resolution { target: String, attempts: u32 },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Marker not found in text: '{marker}'")]
    MarkerNotFound { marker: String },

    #[error("Teaching point not found in case markup: '{name}'")]
    TeachingPointNotFound { name: String },

    #[error("No cached value for {key}")]
    CacheMiss { key: String },

    #[error("Checkpoint at {path} is corrupt: {message}")]
    CheckpointCorrupt { path: String, message: String },

    #[error("No repository URL configured for course '{course}'")]
    UnknownCourse { course: String },

    #[error("Failed to enumerate cases for {course} at {url}: {message}")]
    Enumeration {
        course: String,
        url: String,
        message: String,
    },

    #[error("Job failed for {key}: {message}")]
    Job { key: String, message: String },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, CourseCatalog};
pub use extractor::{Coordinator, RunResult};
pub use state::{RunPhase, WorkItem, WorkKey};
