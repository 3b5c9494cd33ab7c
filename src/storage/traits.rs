//! Storage traits and error types

use crate::storage::{InputRow, OutputColumn, OutputRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown output column in database: {0}")]
    UnknownColumn(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for the tabular store the harvester reads from and writes to
pub trait TabularStore {
    /// Reads every input row in row order
    fn read_rows(&self) -> StorageResult<Vec<InputRow>>;

    /// Writes `rows` into `column`
    ///
    /// Cells are keyed by row id and column, so writing the same rows twice
    /// leaves the store unchanged. Returns the number of cells written.
    fn write_column(&mut self, column: OutputColumn, rows: &[OutputRow]) -> StorageResult<usize>;
}
