//! Pool of authenticated sessions.
//!
//! Credentials are handed out round-robin. A credential that hits a hard
//! lockout is parked for a fixed 24 hours regardless of the reset time the
//! server reports; ordinary per-endpoint throttling is left to the
//! [`RateLimiter`](crate::ratelimit::RateLimiter).

use birdline_core::{CoreError, Credential, EndpointRateState};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// How long a locked-out credential is excluded.
pub const LOCKOUT: ChronoDuration = ChronoDuration::hours(24);

/// API error code for a temporarily locked account.
pub const LOCKED_ACCOUNT_CODE: i64 = 326;

/// Returns true if a response signals a hard lockout of the session.
///
/// That is error code 326, or HTTP 429 without any quota headers (ordinary
/// per-endpoint throttling always carries them).
pub fn is_hard_lockout(status: Option<u16>, has_rate_headers: bool, codes: &[i64]) -> bool {
    codes.contains(&LOCKED_ACCOUNT_CODE) || (status == Some(429) && !has_rate_headers)
}

// ============================================================================
// Pooled Credential
// ============================================================================

/// Why a credential was parked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitRecord {
    /// Endpoint that triggered the lockout.
    pub endpoint: String,
    /// Reset time the server reported, if any.
    pub reset_at: Option<DateTime<Utc>>,
    /// When the lockout was recorded.
    pub limited_at: DateTime<Utc>,
}

/// A credential under pool management.
#[derive(Debug, Clone)]
pub struct PooledCredential {
    /// The session.
    pub credential: Credential,
    /// Latest quota per endpoint seen with this credential.
    pub rate_states: HashMap<String, EndpointRateState>,
    /// Last time the credential was handed out.
    pub last_used: Option<DateTime<Utc>>,
    /// Excluded from rotation until this time.
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Most recent lockout.
    pub limited: Option<LimitRecord>,
}

impl PooledCredential {
    fn new(credential: Credential) -> Self {
        Self {
            credential,
            rate_states: HashMap::new(),
            last_used: None,
            cooldown_until: None,
            limited: None,
        }
    }

    /// Returns true if the credential may be used at `now`.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_none_or(|until| until <= now)
    }
}

/// Point-in-time view of a credential for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    /// Redacted label.
    pub label: String,
    /// In rotation right now.
    pub available: bool,
    /// End of the current cooldown.
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Last time handed out.
    pub last_used: Option<DateTime<Utc>>,
    /// Most recent lockout.
    pub limited: Option<LimitRecord>,
}

// ============================================================================
// Credential Pool
// ============================================================================

#[derive(Debug, Default)]
struct PoolState {
    entries: Vec<PooledCredential>,
    cursor: usize,
}

impl PoolState {
    fn position(&self, credential: &Credential) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.credential.auth_token == credential.auth_token)
    }
}

/// Round-robin pool of sessions with lockout cooldowns.
#[derive(Debug, Default)]
pub struct CredentialPool {
    state: Mutex<PoolState>,
}

impl CredentialPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from credentials, skipping invalid ones and duplicates.
    pub fn from_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let pool = Self::new();
        for credential in credentials {
            if let Err(e) = pool.add(credential) {
                warn!(error = %e, "Skipping credential");
            }
        }
        pool
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a credential.
    ///
    /// Returns `Ok(false)` if a credential with the same auth token is
    /// already pooled.
    pub fn add(&self, credential: Credential) -> Result<bool, CoreError> {
        credential.validate()?;
        let mut state = self.lock();
        if state.position(&credential).is_some() {
            debug!(credential = %credential.label(), "Duplicate credential ignored");
            return Ok(false);
        }
        info!(credential = %credential.label(), "Credential added to pool");
        state.entries.push(PooledCredential::new(credential));
        Ok(true)
    }

    /// Removes the credential at `index`.
    pub fn remove(&self, index: usize) -> Option<Credential> {
        let mut state = self.lock();
        if index >= state.entries.len() {
            return None;
        }
        let removed = state.entries.remove(index);
        if state.cursor > index {
            state.cursor -= 1;
        }
        if state.cursor >= state.entries.len() {
            state.cursor = 0;
        }
        Some(removed.credential)
    }

    /// Number of pooled credentials.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of credentials not in cooldown.
    pub fn available_count(&self) -> usize {
        self.available_count_at(Utc::now())
    }

    /// [`CredentialPool::available_count`] at an explicit time.
    pub fn available_count_at(&self, now: DateTime<Utc>) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.is_available_at(now))
            .count()
    }

    /// Returns the next credential in rotation.
    ///
    /// If every credential is cooling down, the one whose cooldown ends
    /// soonest is returned.
    pub fn next(&self) -> Option<Credential> {
        self.next_at(Utc::now())
    }

    /// [`CredentialPool::next`] at an explicit time.
    pub fn next_at(&self, now: DateTime<Utc>) -> Option<Credential> {
        let mut state = self.lock();
        let len = state.entries.len();
        if len == 0 {
            return None;
        }

        for entry in &mut state.entries {
            if entry.cooldown_until.is_some_and(|until| until <= now) {
                info!(credential = %entry.credential.label(), "Credential cooldown over");
                entry.cooldown_until = None;
            }
        }

        let cursor = state.cursor;
        let available = (0..len)
            .map(|offset| (cursor + offset) % len)
            .find(|&i| state.entries[i].is_available_at(now));

        let index = match available {
            Some(index) => {
                state.cursor = (index + 1) % len;
                index
            }
            None => {
                let soonest = state
                    .entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.cooldown_until)
                    .map_or(0, |(i, _)| i);
                warn!(
                    credential = %state.entries[soonest].credential.label(),
                    "All credentials cooling down, using the one that frees up first"
                );
                soonest
            }
        };

        let entry = &mut state.entries[index];
        entry.last_used = Some(now);
        Some(entry.credential.clone())
    }

    /// Parks a credential after a hard lockout.
    pub fn mark_limited(
        &self,
        credential: &Credential,
        endpoint: &str,
        reset_at: Option<DateTime<Utc>>,
    ) {
        self.mark_limited_at(credential, endpoint, reset_at, Utc::now());
    }

    /// [`CredentialPool::mark_limited`] at an explicit time.
    ///
    /// The cooldown is always [`LOCKOUT`]; `reset_at` is only recorded.
    pub fn mark_limited_at(
        &self,
        credential: &Credential,
        endpoint: &str,
        reset_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        let mut state = self.lock();
        let Some(i) = state.position(credential) else {
            return;
        };
        let entry = &mut state.entries[i];
        let until = now + LOCKOUT;
        entry.cooldown_until = Some(until);
        entry.limited = Some(LimitRecord {
            endpoint: endpoint.to_string(),
            reset_at,
            limited_at: now,
        });
        warn!(
            credential = %credential.label(),
            endpoint,
            until = %until,
            "Credential locked out"
        );
    }

    /// Stores a quota snapshot for a credential.
    pub fn record_rate_state(
        &self,
        credential: &Credential,
        endpoint: &str,
        rate: EndpointRateState,
    ) {
        let mut state = self.lock();
        if let Some(i) = state.position(credential) {
            state.entries[i].rate_states.insert(endpoint.to_string(), rate);
        }
    }

    /// Last quota snapshot for a credential and endpoint.
    pub fn rate_state(&self, credential: &Credential, endpoint: &str) -> Option<EndpointRateState> {
        let state = self.lock();
        let i = state.position(credential)?;
        state.entries[i].rate_states.get(endpoint).copied()
    }

    /// Status of every credential, in pool order.
    pub fn statuses(&self) -> Vec<CredentialStatus> {
        let now = Utc::now();
        self.lock()
            .entries
            .iter()
            .map(|e| CredentialStatus {
                label: e.credential.label(),
                available: e.is_available_at(now),
                cooldown_until: e.cooldown_until,
                last_used: e.last_used,
                limited: e.limited.clone(),
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(n: u32) -> Credential {
        Credential::new(format!("token{n}"), format!("ct0-{n}"))
    }

    fn pool(n: u32) -> CredentialPool {
        let pool = CredentialPool::new();
        for i in 0..n {
            assert!(pool.add(cred(i)).unwrap());
        }
        pool
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_rejects_invalid_and_duplicate() {
        let pool = CredentialPool::new();
        assert!(pool.add(Credential::new("", "ct0")).is_err());
        assert!(pool.add(cred(1)).unwrap());
        assert!(!pool.add(cred(1)).unwrap());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_round_robin() {
        let pool = pool(3);
        let tokens: Vec<String> = (0..6)
            .map(|_| pool.next_at(t0()).unwrap().auth_token)
            .collect();
        assert_eq!(
            tokens,
            ["token0", "token1", "token2", "token0", "token1", "token2"]
        );
    }

    #[test]
    fn test_empty_pool() {
        assert!(CredentialPool::new().next().is_none());
    }

    #[test]
    fn test_limited_excluded_for_full_lockout() {
        let pool = pool(2);
        pool.mark_limited_at(&cred(0), "SearchTimeline", None, t0());
        assert_eq!(pool.available_count_at(t0()), 1);

        let almost = t0() + LOCKOUT - ChronoDuration::seconds(1);
        for _ in 0..4 {
            assert_eq!(pool.next_at(almost).unwrap(), cred(1));
        }

        let after = t0() + LOCKOUT;
        assert_eq!(pool.available_count_at(after), 2);
        let tokens: Vec<String> = (0..2)
            .map(|_| pool.next_at(after).unwrap().auth_token)
            .collect();
        assert!(tokens.contains(&"token0".to_string()));
    }

    #[test]
    fn test_lockout_ignores_server_reset() {
        let pool = pool(1);
        let reset = t0() + ChronoDuration::minutes(15);
        pool.mark_limited_at(&cred(0), "Followers", Some(reset), t0());

        let status = &pool.statuses()[0];
        assert_eq!(status.cooldown_until, Some(t0() + LOCKOUT));
        let limited = status.limited.as_ref().unwrap();
        assert_eq!(limited.endpoint, "Followers");
        assert_eq!(limited.reset_at, Some(reset));
    }

    #[test]
    fn test_all_limited_returns_soonest() {
        let pool = pool(3);
        pool.mark_limited_at(&cred(0), "A", None, t0() + ChronoDuration::hours(2));
        pool.mark_limited_at(&cred(1), "A", None, t0());
        pool.mark_limited_at(&cred(2), "A", None, t0() + ChronoDuration::hours(1));

        assert_eq!(pool.available_count_at(t0()), 0);
        assert_eq!(pool.next_at(t0()).unwrap(), cred(1));
    }

    #[test]
    fn test_remove_keeps_rotation_valid() {
        let pool = pool(3);
        pool.next_at(t0());
        pool.next_at(t0());
        assert_eq!(pool.remove(0), Some(cred(0)));
        assert_eq!(pool.remove(10), None);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.next_at(t0()).unwrap(), cred(2));
        assert_eq!(pool.next_at(t0()).unwrap(), cred(1));
    }

    #[test]
    fn test_record_rate_state() {
        let pool = pool(2);
        let rate = EndpointRateState::new(50, 10, 1_700_000_000);
        pool.record_rate_state(&cred(1), "SearchTimeline", rate);
        assert_eq!(pool.rate_state(&cred(1), "SearchTimeline"), Some(rate));
        assert_eq!(pool.rate_state(&cred(0), "SearchTimeline"), None);
    }

    #[test]
    fn test_from_credentials_skips_invalid() {
        let pool =
            CredentialPool::from_credentials(vec![cred(1), Credential::new("x", ""), cred(1)]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_hard_lockout_detection() {
        assert!(is_hard_lockout(Some(200), true, &[326]));
        assert!(is_hard_lockout(Some(429), false, &[]));
        assert!(!is_hard_lockout(Some(429), true, &[]));
        assert!(!is_hard_lockout(Some(500), false, &[88]));
        assert!(!is_hard_lockout(None, false, &[]));
    }
}
