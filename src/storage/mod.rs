//! Storage module for the curriculum table
//!
//! This module handles the tabular store the harvester reads its input rows
//! from and publishes extracted text into:
//! - SQLite database initialization and schema management
//! - Input row loading
//! - Column writes keyed by row id and column, upserted so reruns converge

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteStore, StoreStats};
pub use traits::{StorageError, StorageResult, TabularStore};

use std::fmt;
use std::path::Path;

/// Opens or creates the curriculum database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open the database or apply the schema
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::open(path)
}

/// One row of the curriculum table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    pub row_id: i64,
    pub course: String,
    pub case_name: String,

    /// `None` when the row's teaching point cell is empty
    pub teaching_point: Option<String>,
}

/// One cell destined for an output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub row_id: i64,

    /// Case name for the synopsis column, teaching point name for the
    /// teaching point column
    pub row_key: String,
    pub value: String,
}

/// Output columns the harvester fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputColumn {
    Synopsis,
    TeachingPointText,
}

impl OutputColumn {
    pub fn all() -> [OutputColumn; 2] {
        [Self::Synopsis, Self::TeachingPointText]
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Synopsis => "synopsis",
            Self::TeachingPointText => "teaching_point_text",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "synopsis" => Some(Self::Synopsis),
            "teaching_point_text" => Some(Self::TeachingPointText),
            _ => None,
        }
    }
}

impl fmt::Display for OutputColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
