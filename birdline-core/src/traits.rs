//! Persistence ports for Birdline.
//!
//! The fetch layer only depends on these traits. File-backed
//! implementations live in `birdline-store`; tests use in-memory ones.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{CursorCheckpoint, OperationIdCache};

/// Durable storage for one pagination checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Loads the checkpoint, `None` if nothing has been saved.
    async fn load(&self) -> Result<Option<CursorCheckpoint>, CoreError>;

    /// Creates or overwrites the checkpoint.
    async fn save(&self, checkpoint: &CursorCheckpoint) -> Result<(), CoreError>;

    /// Removes the checkpoint. Removing a missing checkpoint is not an error.
    async fn clear(&self) -> Result<(), CoreError>;

    /// Human-readable location, shown to the operator for resuming.
    fn location(&self) -> String;
}

/// Durable storage for the operation id cache.
#[async_trait]
pub trait OperationIdStore: Send + Sync {
    /// Loads the cached mapping, `None` if nothing has been saved.
    async fn load(&self) -> Result<Option<OperationIdCache>, CoreError>;

    /// Creates or overwrites the cached mapping.
    async fn save(&self, cache: &OperationIdCache) -> Result<(), CoreError>;
}
