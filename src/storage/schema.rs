//! Database schema definitions

/// SQL schema for the curriculum database
pub const SCHEMA_SQL: &str = r#"
-- Input rows: one (course, case, teaching point) per row
CREATE TABLE IF NOT EXISTS curriculum_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course TEXT NOT NULL,
    case_name TEXT NOT NULL,
    teaching_point TEXT
);

CREATE INDEX IF NOT EXISTS idx_rows_course ON curriculum_rows(course);

-- Extracted text, one cell per row and output column
CREATE TABLE IF NOT EXISTS extracted_cells (
    row_id INTEGER NOT NULL REFERENCES curriculum_rows(id),
    column_id TEXT NOT NULL,
    row_key TEXT NOT NULL,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL,
    PRIMARY KEY (row_id, column_id)
);

CREATE INDEX IF NOT EXISTS idx_cells_column ON extracted_cells(column_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
