//! File-backed operation id cache.

use async_trait::async_trait;
use birdline_core::{CoreError, OperationIdCache, OperationIdStore};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::persistence::{default_operation_ids_path, load_json_opt, save_json};

/// Stores the operation id mapping as `{"ids": {...}, "fetchedAt": ms}`.
#[derive(Debug, Clone)]
pub struct JsonFileOperationIdStore {
    path: PathBuf,
}

impl JsonFileOperationIdStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the per-user default location.
    pub fn at_default_path() -> Self {
        Self::new(default_operation_ids_path())
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OperationIdStore for JsonFileOperationIdStore {
    async fn load(&self) -> Result<Option<OperationIdCache>, CoreError> {
        Ok(load_json_opt(&self.path).await?)
    }

    async fn save(&self, cache: &OperationIdCache) -> Result<(), CoreError> {
        Ok(save_json(&self.path, cache).await?)
    }
}

/// In-process operation id store.
#[derive(Debug, Default)]
pub struct MemoryOperationIdStore {
    cache: Mutex<Option<OperationIdCache>>,
}

impl MemoryOperationIdStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `cache`.
    pub fn with_cache(cache: OperationIdCache) -> Self {
        Self {
            cache: Mutex::new(Some(cache)),
        }
    }

    /// Returns the stored cache.
    pub fn current(&self) -> Option<OperationIdCache> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OperationIdStore for MemoryOperationIdStore {
    async fn load(&self) -> Result<Option<OperationIdCache>, CoreError> {
        Ok(self.current())
    }

    async fn save(&self, cache: &OperationIdCache) -> Result<(), CoreError> {
        *self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(cache.clone());
        Ok(())
    }
}
