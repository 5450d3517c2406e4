//! Storage traits and error types
//!
//! This module defines the trait interface for content store backends and
//! associated error types.

use std::future::Future;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key → content store used as the crawl's download cache
///
/// Both operations are suspension points. Once `save` has returned `Ok` for a
/// key, every later `try_load` of that key must observe the saved content.
pub trait ContentStore: Send + Sync + 'static {
    /// Loads the content stored under `key`
    ///
    /// Returns `Ok(None)` when nothing has been stored for the key yet.
    fn try_load(&self, key: &str) -> impl Future<Output = StorageResult<Option<String>>> + Send;

    /// Stores `content` under `key`, replacing any previous content
    fn save(&self, key: &str, content: &str) -> impl Future<Output = StorageResult<()>> + Send;
}
