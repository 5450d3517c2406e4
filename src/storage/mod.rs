//! Storage module for persisting downloaded documents
//!
//! This module handles the content store the crawler uses as its download
//! cache, including:
//! - The `ContentStore` trait (try-load and save by key)
//! - A file system backend writing one file per document
//! - A SQLite backend keeping documents in a single database
//! - An in-memory backend

mod files;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use files::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContentStore, StorageError, StorageResult};

use crate::config::{OutputConfig, StoreBackend};
use std::path::Path;

/// Content store selected at runtime from configuration
pub enum AnyStore {
    Files(FileStore),
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl ContentStore for AnyStore {
    async fn try_load(&self, key: &str) -> StorageResult<Option<String>> {
        match self {
            Self::Files(store) => store.try_load(key).await,
            Self::Sqlite(store) => store.try_load(key).await,
            Self::Memory(store) => store.try_load(key).await,
        }
    }

    async fn save(&self, key: &str, content: &str) -> StorageResult<()> {
        match self {
            Self::Files(store) => store.save(key, content).await,
            Self::Sqlite(store) => store.save(key, content).await,
            Self::Memory(store) => store.save(key, content).await,
        }
    }
}

/// Opens the content store described by the output configuration
///
/// # Returns
///
/// * `Ok(AnyStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open the backing database
pub fn open_store(config: &OutputConfig) -> StorageResult<AnyStore> {
    match config.backend {
        StoreBackend::Files => {
            tracing::info!("Storing documents under {}", config.download_dir);
            Ok(AnyStore::Files(FileStore::new(&config.download_dir)))
        }
        StoreBackend::Sqlite => {
            tracing::info!("Storing documents in {}", config.database_path);
            Ok(AnyStore::Sqlite(SqliteStore::new(Path::new(
                &config.database_path,
            ))?))
        }
        StoreBackend::Memory => {
            tracing::info!("Storing documents in memory only");
            Ok(AnyStore::Memory(MemoryStore::new()))
        }
    }
}
