//! Host APIs for the Birdline request pipeline.
//!
//! - [`http`] - HTTP client with tracing, domain allowlist and proxy routing

pub mod http;

pub use http::{HttpClient, ResponseExt};
