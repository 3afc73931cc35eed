//! Operation id cache record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted mapping of GraphQL operation name to query id.
///
/// Serialized as `{"ids": {...}, "fetchedAt": <epoch ms>}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationIdCache {
    /// Operation name to query id.
    pub ids: BTreeMap<String, String>,
    /// When the mapping was fetched, epoch milliseconds.
    pub fetched_at: i64,
}

impl OperationIdCache {
    /// Creates a cache record.
    pub fn new(ids: BTreeMap<String, String>, fetched_at: i64) -> Self {
        Self { ids, fetched_at }
    }

    /// Returns true while the mapping is younger than `ttl_ms`.
    pub fn is_fresh_at(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.fetched_at) < ttl_ms
    }

    /// Looks up one operation.
    pub fn get(&self, operation: &str) -> Option<&str> {
        self.ids.get(operation).map(String::as_str)
    }
}
