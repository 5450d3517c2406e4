//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite content store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per stored document, keyed by storage key
CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY NOT NULL,
    content TEXT NOT NULL,
    saved_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// Safe to call on an already initialized database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
