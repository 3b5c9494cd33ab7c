//! Statistics gathered from the store and the checkpoint file

use crate::checkpoint::CheckpointManager;
use crate::extractor::RunResult;
use crate::storage::{SqliteStore, StoreStats};
use crate::HarvestError;
use chrono::{DateTime, Utc};

/// What the last checkpoint holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSummary {
    pub saved_at: DateTime<Utc>,
    pub cache_entries: usize,
    pub processed_items: usize,
    pub config_hash: Option<String>,
}

/// Harvest statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestStatistics {
    pub store: StoreStats,

    /// `None` when no checkpoint has been written yet
    pub checkpoint: Option<CheckpointSummary>,
}

impl HarvestStatistics {
    /// Output cells the input rows call for
    pub fn expected_cells(&self) -> u64 {
        self.store.rows + self.store.rows_with_teaching_point
    }

    /// Output cells already written
    pub fn written_cells(&self) -> u64 {
        self.store.synopsis_cells + self.store.teaching_point_cells
    }
}

/// Loads statistics from the store and the checkpoint file
///
/// # Arguments
///
/// * `store` - The store to query
/// * `checkpoints` - Manager of the checkpoint file to inspect
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - The store query failed or the checkpoint is corrupt
pub async fn load_statistics(
    store: &SqliteStore,
    checkpoints: &CheckpointManager,
) -> Result<HarvestStatistics, HarvestError> {
    let store_stats = store.stats()?;

    let checkpoint = checkpoints
        .load()
        .await?
        .map(|checkpoint| CheckpointSummary {
            saved_at: checkpoint.saved_at,
            cache_entries: checkpoint.entry_count(),
            processed_items: checkpoint.processed_count(),
            config_hash: checkpoint.config_hash.clone(),
        });

    Ok(HarvestStatistics {
        store: store_stats,
        checkpoint,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Store:");
    println!("  Input rows: {}", stats.store.rows);
    println!(
        "  Rows naming a teaching point: {}",
        stats.store.rows_with_teaching_point
    );
    println!(
        "  Synopsis cells: {} ({:.1}%)",
        stats.store.synopsis_cells,
        percentage(stats.store.synopsis_cells, stats.store.rows)
    );
    println!(
        "  Teaching point cells: {} ({:.1}%)",
        stats.store.teaching_point_cells,
        percentage(
            stats.store.teaching_point_cells,
            stats.store.rows_with_teaching_point
        )
    );
    println!();

    match &stats.checkpoint {
        Some(checkpoint) => {
            println!("Checkpoint:");
            println!("  Saved at: {}", checkpoint.saved_at.to_rfc3339());
            println!("  Cache entries: {}", checkpoint.cache_entries);
            println!("  Processed items: {}", checkpoint.processed_items);
            if let Some(hash) = &checkpoint.config_hash {
                println!("  Config hash: {}", hash);
            }
        }
        None => println!("Checkpoint: none"),
    }
    println!();

    println!(
        "Completion: {:.1}% ({} / {} cells written)",
        percentage(stats.written_cells(), stats.expected_cells()),
        stats.written_cells(),
        stats.expected_cells()
    );
}

/// Prints the outcome of a run to stdout
pub fn print_run_result(result: &RunResult) {
    println!("=== Harvest Complete ===\n");
    println!("  Jobs succeeded: {}", result.succeeded);
    println!("  Jobs failed: {}", result.failed);
    println!("  Cells omitted: {}", result.omitted);
    println!("  Rows skipped (already processed): {}", result.skipped);
}
