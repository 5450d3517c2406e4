//! File system content store
//!
//! Each key is a relative `/`-separated path under a root directory.
//! Directories are created on demand.

use crate::storage::traits::{ContentStore, StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Content store writing one file per document under a root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`
    ///
    /// The directory itself is created lazily on the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path under the root
    ///
    /// Keys that are empty, absolute, or contain `..` are rejected so that no
    /// key can address a file outside the root.
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);

        if key.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

impl ContentStore for FileStore {
    async fn try_load(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, content: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), content.len());
        Ok(())
    }
}
