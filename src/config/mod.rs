//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and builds the course catalog the coordinator enumerates from.
//!
//! # Example
//!
//! ```no_run
//! use case_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Up to {} concurrent jobs", config.extraction.max_concurrent_jobs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CourseCatalog, CourseEntry, ExtractionConfig, OutputConfig, SessionConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
