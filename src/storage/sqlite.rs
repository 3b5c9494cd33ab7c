//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the TabularStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, TabularStore};
use crate::storage::{InputRow, OutputColumn, OutputRow};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// Cell and row counts of a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub rows: u64,
    pub rows_with_teaching_point: u64,
    pub synopsis_cells: u64,
    pub teaching_point_cells: u64,
}

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Appends an input row and returns its id
    pub fn insert_row(
        &mut self,
        course: &str,
        case_name: &str,
        teaching_point: Option<&str>,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO curriculum_rows (course, case_name, teaching_point) VALUES (?1, ?2, ?3)",
            params![course, case_name, teaching_point],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Reads every cell written to `column`, ordered by row id
    pub fn read_column(&self, column: OutputColumn) -> StorageResult<Vec<OutputRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT row_id, row_key, value FROM extracted_cells
             WHERE column_id = ?1 ORDER BY row_id",
        )?;

        let rows = stmt
            .query_map(params![column.to_db_string()], |row| {
                Ok(OutputRow {
                    row_id: row.get(0)?,
                    row_key: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Gathers row and cell counts
    pub fn stats(&self) -> StorageResult<StoreStats> {
        let rows: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM curriculum_rows", [], |row| row.get(0))?;

        let rows_with_teaching_point: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM curriculum_rows
             WHERE teaching_point IS NOT NULL AND TRIM(teaching_point) != ''",
            [],
            |row| row.get(0),
        )?;

        let mut stats = StoreStats {
            rows: rows as u64,
            rows_with_teaching_point: rows_with_teaching_point as u64,
            ..StoreStats::default()
        };

        let mut stmt = self
            .conn
            .prepare("SELECT column_id, COUNT(*) FROM extracted_cells GROUP BY column_id")?;
        let counts = stmt.query_map([], |row| {
            let column: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((column, count))
        })?;

        for entry in counts {
            let (column, count) = entry?;
            match OutputColumn::from_db_string(&column) {
                Some(OutputColumn::Synopsis) => stats.synopsis_cells = count as u64,
                Some(OutputColumn::TeachingPointText) => stats.teaching_point_cells = count as u64,
                None => return Err(StorageError::UnknownColumn(column)),
            }
        }

        Ok(stats)
    }
}

/// Trims a cell, mapping blank cells to `None`
fn non_blank(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl TabularStore for SqliteStore {
    fn read_rows(&self) -> StorageResult<Vec<InputRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course, case_name, teaching_point FROM curriculum_rows ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(InputRow {
                    row_id: row.get(0)?,
                    course: row.get::<_, String>(1)?.trim().to_string(),
                    case_name: row.get::<_, String>(2)?.trim().to_string(),
                    teaching_point: non_blank(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn write_column(&mut self, column: OutputColumn, rows: &[OutputRow]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO extracted_cells (row_id, column_id, row_key, value, written_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(row_id, column_id) DO UPDATE SET
                    row_key = excluded.row_key,
                    value = excluded.value,
                    written_at = excluded.written_at",
            )?;

            for row in rows {
                stmt.execute(params![
                    row.row_id,
                    column.to_db_string(),
                    row.row_key,
                    row.value,
                    now
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Wrote {} cells to column {}", rows.len(), column);
        Ok(rows.len())
    }
}
