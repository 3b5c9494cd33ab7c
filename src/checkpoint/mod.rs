//! Extraction cache and checkpointing
//!
//! This module holds everything that survives a crash:
//! - the cache of cleaned synopsis and teaching-point text
//! - the set of work items that reached a terminal state
//! - atomic snapshots of both to a single JSON file, and their restoration

mod cache;
mod manager;

pub use cache::{CacheKey, PipelineState, ScrapeCache, SharedState};
pub use manager::{Checkpoint, CheckpointManager, CHECKPOINT_VERSION};
