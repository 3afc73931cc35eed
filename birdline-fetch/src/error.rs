//! Fetch error types.

use std::path::PathBuf;
use thiserror::Error;

/// Longest response body kept in a [`FetchError::Transport`].
pub const MAX_ERROR_BODY_CHARS: usize = 500;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No query id could be resolved for the operation.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Non-2xx status or network-level failure.
    #[error("{}", transport_message(.status, .body))]
    Transport {
        /// HTTP status, `None` for connect/timeout/IO failures.
        status: Option<u16>,
        /// Response body (truncated) or the network error text.
        body: String,
    },

    /// The call succeeded but the payload carries API errors.
    #[error("API error: {}", .messages.join("; "))]
    RemoteApi {
        /// Messages of every reported error.
        messages: Vec<String>,
        /// Numeric error codes, where present.
        codes: Vec<i64>,
    },

    /// The proxy list file could not be read.
    #[error("Proxy file {}: {source}", .path.display())]
    ProxyFile {
        /// File that was requested.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A single proxy spec could not be parsed.
    #[error("Invalid proxy spec '{spec}': {reason}")]
    InvalidProxy {
        /// The offending spec.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Reading or writing resume state failed.
    #[error("Checkpoint IO error: {0}")]
    CheckpointIo(String),

    /// The credential pool is empty.
    #[error("No credentials configured")]
    NoCredentials,

    /// The response body was not what the parser expected.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP client construction or request building failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] birdline_core::CoreError),
}

fn transport_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("Transport error: HTTP {code}: {body}"),
        None => format!("Transport error: {body}"),
    }
}

impl FetchError {
    /// Builds a transport error from an HTTP status and body.
    pub fn http_status(status: u16, body: &str) -> Self {
        FetchError::Transport {
            status: Some(status),
            body: truncate_body(body),
        }
    }

    /// Builds a transport error from a network failure.
    pub fn network(err: &reqwest::Error) -> Self {
        let body = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        FetchError::Transport { status: None, body }
    }

    /// Builds a checkpoint error for the store at `location`.
    pub fn checkpoint_io(location: &str, err: &birdline_core::CoreError) -> Self {
        FetchError::CheckpointIo(format!("{location}: {err}"))
    }

    /// Returns the HTTP status for transport errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns true for transport errors, which rotate the egress path.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }

    /// Returns true if the server throttled the request.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

/// Truncates a response body to [`MAX_ERROR_BODY_CHARS`] characters.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut out: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push('…');
    out
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The proxy could not be turned into a client.
    #[error("Proxy setup failed for {uri}: {reason}")]
    Proxy {
        /// Normalized proxy URI.
        uri: String,
        /// Builder error text.
        reason: String,
    },
}
