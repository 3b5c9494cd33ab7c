//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunPhase`: The phases a coordinator run moves through
//! - `WorkItem`: One (case, teaching point) pair scheduled for extraction
//! - `WorkKey`: The identity of a work item, used for deduplication and resume

mod run_phase;
mod work_item;

// Re-export main types
pub use run_phase::RunPhase;
pub use work_item::{WorkItem, WorkKey};
