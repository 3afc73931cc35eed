//! Advisory per-endpoint rate limiting.
//!
//! The server reports its quota in `x-rate-limit-*` response headers. The
//! limiter remembers the latest report per endpoint and delays callers
//! before the quota runs out. It never rejects a call.

use birdline_core::EndpointRateState;
use chrono::Utc;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// At or below this many remaining calls the limiter starts spacing calls out.
pub const LOW_QUOTA_THRESHOLD: u32 = 5;

/// Total delay spread over the remaining calls of a nearly exhausted window.
pub const LOW_QUOTA_BUDGET: Duration = Duration::from_secs(10);

/// Extra wait after the reset time before calling an exhausted endpoint.
pub const RESET_BUFFER: Duration = Duration::from_secs(1);

const LIMIT_HEADER: &str = "x-rate-limit-limit";
const REMAINING_HEADER: &str = "x-rate-limit-remaining";
const RESET_HEADER: &str = "x-rate-limit-reset";

// ============================================================================
// Header Parsing
// ============================================================================

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Returns true if the response carries any `x-rate-limit-*` header.
pub fn has_rate_headers(headers: &HeaderMap) -> bool {
    [LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER]
        .iter()
        .any(|name| headers.contains_key(*name))
}

/// Parses the quota headers of a response.
///
/// Needs at least `remaining` and `reset`; a missing limit is reported as 0.
pub fn parse_rate_headers(headers: &HeaderMap) -> Option<EndpointRateState> {
    let remaining: i64 = header_value(headers, REMAINING_HEADER)?;
    let reset: i64 = header_value(headers, RESET_HEADER)?;
    let limit: u32 = header_value(headers, LIMIT_HEADER).unwrap_or(0);
    let remaining = u32::try_from(remaining.max(0)).unwrap_or(u32::MAX);
    Some(EndpointRateState::new(limit, remaining, reset))
}

// ============================================================================
// Rate Limiter
// ============================================================================

/// Tracks server-reported quota per logical endpoint.
#[derive(Debug, Default)]
pub struct RateLimiter {
    states: Mutex<HashMap<String, EndpointRateState>>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, EndpointRateState>> {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records the latest quota for an endpoint, replacing any earlier one.
    pub fn update(&self, endpoint: &str, state: EndpointRateState) {
        debug!(
            endpoint,
            limit = state.limit,
            remaining = state.remaining,
            reset = state.reset,
            "Rate state updated"
        );
        self.lock().insert(endpoint.to_string(), state);
    }

    /// Returns the recorded quota for an endpoint.
    pub fn state(&self, endpoint: &str) -> Option<EndpointRateState> {
        self.lock().get(endpoint).copied()
    }

    /// Number of endpoints with recorded quota.
    pub fn tracked_endpoints(&self) -> usize {
        self.lock().len()
    }

    /// Computes how long a call to `endpoint` should wait at `now_ms`.
    ///
    /// Stale state (reset already passed) is discarded.
    pub fn wait_duration_at(&self, endpoint: &str, now_ms: i64) -> Option<Duration> {
        let mut states = self.lock();
        let state = *states.get(endpoint)?;

        if state.remaining > LOW_QUOTA_THRESHOLD {
            return None;
        }

        if state.is_stale_at(now_ms) {
            states.remove(endpoint);
            debug!(endpoint, "Rate window already reset, dropping state");
            return None;
        }

        if state.remaining == 0 {
            let until_reset = u64::try_from(state.reset_ms() - now_ms).unwrap_or(0);
            return Some(Duration::from_millis(until_reset) + RESET_BUFFER);
        }

        Some(LOW_QUOTA_BUDGET / state.remaining)
    }

    /// Sleeps if the endpoint's quota is exhausted or nearly so.
    ///
    /// Returns how long the caller was delayed.
    pub async fn wait_if_needed(&self, endpoint: &str) -> Duration {
        let now_ms = Utc::now().timestamp_millis();
        let Some(wait) = self.wait_duration_at(endpoint, now_ms) else {
            return Duration::ZERO;
        };

        info!(
            endpoint,
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            "Rate limit low, waiting"
        );
        tokio::time::sleep(wait).await;
        wait
    }
}

// ============================================================================
// Tests
// ============================================================================
