// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Birdline Store
//!
//! File-backed persistence and configuration for the Birdline client.
//!
//! This crate provides:
//!
//! - **Checkpoint stores**: resume state for paginated fetches
//! - **Operation id store**: the cached operation name to query id mapping
//! - **Config**: the JSON configuration file
//! - **Credentials**: loading sessions from a file or the environment
//! - **Persistence**: atomic JSON file I/O with owner-only permissions
//!
//! ## Usage
//!
//! ```ignore
//! use birdline_store::{Config, JsonFileCheckpointStore};
//!
//! let config = Config::load().await?;
//! let checkpoints = JsonFileCheckpointStore::new("search.resume.json");
//! ```

pub mod checkpoint;
pub mod config;
pub mod credentials;
pub mod error;
pub mod operation_ids;
pub mod persistence;

pub use checkpoint::{JsonFileCheckpointStore, MemoryCheckpointStore};
pub use config::{Config, EgressConfig, NetworkConfig, OperationsConfig, PaginationConfig};
pub use credentials::{credential_from_env, load_credentials_file};
pub use error::StoreError;
pub use operation_ids::{JsonFileOperationIdStore, MemoryOperationIdStore};
pub use persistence::{
    default_config_dir, default_config_path, default_credentials_path,
    default_operation_ids_path, load_json, load_json_opt, remove_file, save_json,
};
#[cfg(test)]
mod persistence_tests;
