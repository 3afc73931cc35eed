// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Birdline Fetch
//!
//! The request-resilience pipeline for the Birdline client.
//!
//! Every outbound call passes through one orchestrator that decides which
//! session and which proxy to use, whether to wait first, and how to tag
//! the request. Multi-page fetches are driven by a checkpointing paginator.
//!
//! ## Pipeline Components
//!
//! - [`operations::OperationResolver`] - Operation name to query id
//! - [`tagging`] - Per-request transaction ids
//! - [`ratelimit::RateLimiter`] - Server-reported quota per endpoint
//! - [`egress::EgressManager`] - Proxy rotation with health tracking
//! - [`credentials::CredentialPool`] - Session rotation with lockouts
//! - [`client::ApiClient`] - The orchestrator
//! - [`paginator::Paginator`] - Resumable cursor pagination
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing, domain allowlist and proxy routing
//!
//! ## Example
//!
//! ```ignore
//! use birdline_fetch::{ApiClient, FetchContext, PageLimit, Paginator};
//!
//! let client = ApiClient::new(FetchContext::builder().credentials(pool).build());
//! let variables = serde_json::json!({"rawQuery": "rust", "count": 20});
//!
//! let outcome = Paginator::new()
//!     .with_limit(PageLimit::Pages(5))
//!     .run(|cursor| client.timeline_page("SearchTimeline", &variables, cursor))
//!     .await?;
//! ```

// Core modules
pub mod client;
pub mod context;
pub mod credentials;
pub mod egress;
pub mod error;
pub mod host;
pub mod operations;
pub mod paginator;
pub mod ratelimit;
pub mod tagging;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root

// Errors
pub use error::{FetchError, HttpError};

// Host APIs
pub use host::http::{HttpClient, ResponseExt};

// Pipeline
pub use client::ApiClient;
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};
pub use credentials::{CredentialPool, CredentialStatus, PooledCredential};
pub use egress::{EgressHealth, EgressManager, EgressPath, EgressStatus, ProxyScheme};
pub use operations::OperationResolver;
pub use paginator::{PageLimit, PaginationFailure, PaginationOutcome, Paginator, StopReason};
pub use ratelimit::RateLimiter;
pub use tagging::{generate_tag, generate_tag_for};
pub use timeline::parse_timeline_page;
