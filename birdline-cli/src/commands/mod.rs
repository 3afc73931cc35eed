//! CLI command implementations.

pub mod call;
pub mod config;
pub mod credentials;
pub mod fetch;
pub mod operations;
pub mod proxies;
