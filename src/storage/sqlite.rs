//! SQLite content store implementation
//!
//! This module provides a SQLite-based implementation of the ContentStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentStore, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite content store backend
///
/// Statements are short and run while holding the connection lock; no lock is
/// ever held across an await point.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the number of stored documents
    pub fn document_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns when the document under `key` was last saved
    pub fn saved_at(&self, key: &str) -> StorageResult<Option<DateTime<Utc>>> {
        let saved_at: Option<String> = self
            .lock()
            .query_row(
                "SELECT saved_at FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(saved_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn load_sync(&self, key: &str) -> StorageResult<Option<String>> {
        let content = self
            .lock()
            .query_row(
                "SELECT content FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    fn save_sync(&self, key: &str, content: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.lock().execute(
            "INSERT INTO documents (key, content, saved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET content = excluded.content, saved_at = excluded.saved_at",
            params![key, content, now],
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContentStore for SqliteStore {
    async fn try_load(&self, key: &str) -> StorageResult<Option<String>> {
        self.load_sync(key)
    }

    async fn save(&self, key: &str, content: &str) -> StorageResult<()> {
        self.save_sync(key, content)
    }
}
