//! Output module for run summaries and statistics
//!
//! This module handles:
//! - Reporting the outcome of a harvest run
//! - Gathering store and checkpoint statistics for `--stats`

pub mod stats;

pub use stats::{
    load_statistics, print_run_result, print_statistics, CheckpointSummary, HarvestStatistics,
};
