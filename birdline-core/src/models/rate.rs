//! Endpoint rate-limit state.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Server-reported quota for one logical endpoint.
///
/// Mirrors the `x-rate-limit-limit`, `x-rate-limit-remaining` and
/// `x-rate-limit-reset` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRateState {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Window reset, epoch seconds.
    pub reset: i64,
}

impl EndpointRateState {
    /// Creates a new rate state.
    pub fn new(limit: u32, remaining: u32, reset: i64) -> Self {
        Self {
            limit,
            remaining,
            reset,
        }
    }

    /// Reset time in epoch milliseconds.
    pub fn reset_ms(&self) -> i64 {
        self.reset.saturating_mul(1000)
    }

    /// Reset time as a timestamp.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.reset, 0).single()
    }

    /// Returns true once `now_ms` is past the reset time.
    pub fn is_stale_at(&self, now_ms: i64) -> bool {
        now_ms > self.reset_ms()
    }

    /// Returns true if the window is exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}
