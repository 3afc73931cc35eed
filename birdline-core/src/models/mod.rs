//! Domain models for Birdline.
//!
//! ## Submodules
//!
//! - [`credential`] - Authenticated session tokens
//! - [`rate`] - Server-reported endpoint quota
//! - [`page`] - Page results and resume checkpoints
//! - [`operation`] - Operation id cache record

mod credential;
mod operation;
mod page;
mod rate;

// Re-export everything at the models level
pub use credential::Credential;
pub use operation::OperationIdCache;
pub use page::{CursorCheckpoint, PageResult};
pub use rate::EndpointRateState;
#[cfg(test)]
mod serde_tests;
