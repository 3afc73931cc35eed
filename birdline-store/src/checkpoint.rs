//! Checkpoint stores.
//!
//! - [`JsonFileCheckpointStore`] - One checkpoint per JSON file, path chosen by the caller
//! - [`MemoryCheckpointStore`] - In-process store that counts writes

use async_trait::async_trait;
use birdline_core::{CheckpointStore, CoreError, CursorCheckpoint};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::persistence::{load_json_opt, remove_file, save_json};

// ============================================================================
// JSON File Store
// ============================================================================

/// Stores a pagination checkpoint in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
}

impl JsonFileCheckpointStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpointStore {
    async fn load(&self) -> Result<Option<CursorCheckpoint>, CoreError> {
        Ok(load_json_opt(&self.path).await?)
    }

    async fn save(&self, checkpoint: &CursorCheckpoint) -> Result<(), CoreError> {
        save_json(&self.path, checkpoint).await?;
        debug!(
            path = %self.path.display(),
            pages = checkpoint.pages_fetched,
            items = checkpoint.total_items,
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), CoreError> {
        Ok(remove_file(&self.path).await?)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Memory Store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    checkpoint: Option<CursorCheckpoint>,
    saves: usize,
    clears: usize,
}

/// In-process checkpoint store.
///
/// Useful for one-shot runs that do not need durable resume, and for
/// observing the paginator's write pattern.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a checkpoint.
    pub fn with_checkpoint(checkpoint: CursorCheckpoint) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                checkpoint: Some(checkpoint),
                ..MemoryInner::default()
            }),
        }
    }

    /// Returns the stored checkpoint.
    pub fn current(&self) -> Option<CursorCheckpoint> {
        self.lock().checkpoint.clone()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Number of `clear` calls so far.
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<CursorCheckpoint>, CoreError> {
        Ok(self.lock().checkpoint.clone())
    }

    async fn save(&self, checkpoint: &CursorCheckpoint) -> Result<(), CoreError> {
        let mut inner = self.lock();
        inner.checkpoint = Some(checkpoint.clone());
        inner.saves += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CoreError> {
        let mut inner = self.lock();
        inner.checkpoint = None;
        inner.clears += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
