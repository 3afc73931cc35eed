// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Birdline Core
//!
//! Core types, models, and persistence ports for the Birdline client.
//!
//! This crate provides the foundational abstractions shared by every other
//! Birdline crate:
//!
//! - Domain models (credentials, rate-limit state, pages, checkpoints)
//! - Error types
//! - Persistence port traits implemented by `birdline-store`
//!
//! ## Key Types
//!
//! ### Identity
//! - [`Credential`] - One authenticated web session (auth token + ct0)
//!
//! ### Throttling
//! - [`EndpointRateState`] - Server-reported quota for one endpoint
//!
//! ### Pagination
//! - [`PageResult`] - One fetched page of items
//! - [`CursorCheckpoint`] - Resumable pagination progress
//!
//! ### Operation Ids
//! - [`OperationIdCache`] - Persisted operation name to query id mapping

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Identity
    Credential,
    // Throttling
    EndpointRateState,
    // Pagination
    CursorCheckpoint,
    PageResult,
    // Operation ids
    OperationIdCache,
};

// Re-export traits
pub use traits::{CheckpointStore, OperationIdStore};
