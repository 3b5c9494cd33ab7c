//! Extraction module: the resumable, concurrent harvest pipeline
//!
//! This module contains the core extraction logic, including:
//! - Case listing for repository pages
//! - Teaching point section parsing
//! - Bounded-concurrency job scheduling
//! - Overall run coordination

mod coordinator;
mod index;
mod scheduler;
mod sections;

pub use coordinator::{Coordinator, RunResult};
pub use index::{parse_case_names, DocumentIndex};
pub use scheduler::{ConcurrencyScheduler, SchedulerReport};
pub use sections::{parse_teaching_point, ScrapedUnit};

use crate::browser::HttpBrowser;
use crate::checkpoint::CheckpointManager;
use crate::config::Config;
use crate::storage::open_store;
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete harvest against the configured repository and store
///
/// This is the main entry point for a run. It will:
/// 1. Open the tabular store
/// 2. Build the HTTP browser carrying the session cookie
/// 3. Discard the checkpoint if a fresh run was requested
/// 4. Drive the coordinator through every phase
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stamped into checkpoints
/// * `cookie` - Cookie header of the authenticated session, if any
/// * `fresh` - Whether to ignore and delete the existing checkpoint
///
/// # Returns
///
/// * `Ok(RunResult)` - The run reached `Done`
/// * `Err(HarvestError)` - The run failed
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    cookie: Option<&str>,
    fresh: bool,
) -> Result<RunResult, HarvestError> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let browser = HttpBrowser::from_session(
        &config.session,
        cookie,
        config.extraction.navigation_timeout(),
    )?;

    let checkpoints =
        CheckpointManager::new(&config.output.checkpoint_path).with_config_hash(config_hash);
    if fresh && checkpoints.discard().await? {
        tracing::info!("Discarded checkpoint at {}", checkpoints.path().display());
    }

    let mut coordinator = Coordinator::new(
        config.extraction.clone(),
        config.catalog(),
        Arc::new(browser),
        store,
        checkpoints,
    );
    coordinator.run().await
}
