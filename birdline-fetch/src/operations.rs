//! Operation name to query id resolution.
//!
//! Every GraphQL operation is addressed by an opaque query id that the web
//! client ships in its JavaScript bundles and rotates without notice. The
//! resolver serves ids from a persisted cache while it is fresh, falls back
//! to a built-in table otherwise, and can refresh the cache by scanning the
//! current bundles.

use birdline_core::{OperationIdCache, OperationIdStore};
use chrono::Utc;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::egress::EgressPath;
use crate::error::FetchError;
use crate::host::http::HttpClient;

/// Query ids known to work at release time.
pub const FALLBACK_OPERATIONS: &[(&str, &str)] = &[
    ("Bookmarks", "QUjXply7fA7fk05FRyajEg"),
    ("Followers", "OGScL-RC4DFMsRGOCjPR6g"),
    ("Following", "o5eNLkJb03ayTQa97Cpp7w"),
    ("HomeTimeline", "HJFjzBgCs16TqxewQOeLNg"),
    ("Likes", "eSSNbhECHHWWALkkQq-YTA"),
    ("ListLatestTweetsTimeline", "2TemLyqrMpTeAmysdbnVqw"),
    ("SearchTimeline", "nK1dw4oV3k4w5TdtcAdSww"),
    ("TweetDetail", "nBS-WpgA6ZG0CyNHD517JQ"),
    ("UserByRestId", "I5nvpI91ljifos1Y3Lltyg"),
    ("UserByScreenName", "xmU6X_CKVnQ5lSrCbAmJsg"),
    ("UserTweets", "V7H0Ap3_Hh2FyS75OCDO3Q"),
];

// Bundle script tags on the home page.
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^>]+src="([^"]+/(?:main|api)\.[^"/]*\.js)""#)
        .unwrap_or_else(|e| panic!("invalid script regex: {e}"))
});

static ID_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"queryId:"([\w-]+)",operationName:"(\w+)""#)
        .unwrap_or_else(|e| panic!("invalid operation regex: {e}"))
});

static NAME_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"operationName:"(\w+)",queryId:"([\w-]+)""#)
        .unwrap_or_else(|e| panic!("invalid operation regex: {e}"))
});

/// Returns the built-in table.
pub fn fallback_table() -> BTreeMap<String, String> {
    FALLBACK_OPERATIONS
        .iter()
        .map(|(name, id)| ((*name).to_string(), (*id).to_string()))
        .collect()
}

/// Extracts bundle script URLs from the home page, resolved against `origin`.
pub fn extract_bundle_urls(html: &str, origin: &str) -> Vec<String> {
    let base = Url::parse(origin).ok();
    let mut urls: Vec<String> = Vec::new();
    for caps in SCRIPT_RE.captures_iter(html) {
        let src = &caps[1];
        let resolved = match &base {
            Some(base) => base.join(src).map(String::from).unwrap_or_else(|_| src.to_string()),
            None => src.to_string(),
        };
        if !urls.contains(&resolved) {
            urls.push(resolved);
        }
    }
    urls
}

/// Extracts `(operationName, queryId)` pairs from bundle source.
pub fn extract_operation_ids(source: &str) -> BTreeMap<String, String> {
    let mut ids = BTreeMap::new();
    for caps in ID_FIRST_RE.captures_iter(source) {
        ids.insert(caps[2].to_string(), caps[1].to_string());
    }
    for caps in NAME_FIRST_RE.captures_iter(source) {
        ids.insert(caps[1].to_string(), caps[2].to_string());
    }
    ids
}

// ============================================================================
// Operation Resolver
// ============================================================================

/// Resolves operation names to query ids.
pub struct OperationResolver {
    store: Option<Arc<dyn OperationIdStore>>,
    cache: Mutex<Option<OperationIdCache>>,
    ttl: Duration,
}

impl std::fmt::Debug for OperationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationResolver")
            .field("cached", &self.lock().as_ref().map(|c| c.ids.len()))
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl OperationResolver {
    /// Creates a resolver with no cache store; only the fallback table is used.
    pub fn fallback_only(ttl: Duration) -> Self {
        Self {
            store: None,
            cache: Mutex::new(None),
            ttl,
        }
    }

    /// Creates a resolver backed by `store`, loading the current cache.
    ///
    /// An unreadable cache is logged and treated as absent.
    pub async fn open(store: Arc<dyn OperationIdStore>, ttl: Duration) -> Self {
        let cache = match store.load().await {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Operation id cache unreadable, ignoring");
                None
            }
        };
        if let Some(cache) = &cache {
            debug!(
                ids = cache.ids.len(),
                fetched_at = cache.fetched_at,
                "Operation id cache loaded"
            );
        }
        Self {
            store: Some(store),
            cache: Mutex::new(cache),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OperationIdCache>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    /// Returns true if the cache is present and within its TTL.
    pub fn is_fresh(&self) -> bool {
        let now_ms = Utc::now().timestamp_millis();
        self.lock()
            .as_ref()
            .is_some_and(|c| c.is_fresh_at(now_ms, self.ttl_ms()))
    }

    /// Resolves an operation name.
    pub fn resolve(&self, name: &str) -> Result<String, FetchError> {
        self.resolve_at(name, Utc::now().timestamp_millis())
    }

    /// [`OperationResolver::resolve`] at an explicit time.
    pub fn resolve_at(&self, name: &str, now_ms: i64) -> Result<String, FetchError> {
        let cached = self
            .lock()
            .as_ref()
            .filter(|c| c.is_fresh_at(now_ms, self.ttl_ms()))
            .and_then(|c| c.get(name).map(str::to_string));
        if let Some(id) = cached {
            return Ok(id);
        }

        FALLBACK_OPERATIONS
            .iter()
            .find(|(op, _)| *op == name)
            .map(|(_, id)| (*id).to_string())
            .ok_or_else(|| FetchError::UnknownOperation(name.to_string()))
    }

    /// Current mapping without doing any I/O.
    ///
    /// The cached mapping if one was loaded or refreshed, otherwise the
    /// fallback table.
    pub fn list(&self) -> BTreeMap<String, String> {
        self.lock()
            .as_ref()
            .map_or_else(fallback_table, |c| c.ids.clone())
    }

    /// Refreshes the mapping from the live web client.
    ///
    /// Never fails: on any network or parse problem the fallback table is
    /// returned and the cache is left as it was.
    pub async fn refresh(
        &self,
        http: &HttpClient,
        origin: &str,
        via: Option<&EgressPath>,
    ) -> BTreeMap<String, String> {
        match self.try_refresh(http, origin, via).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Operation id refresh failed, using fallback table");
                fallback_table()
            }
        }
    }

    /// [`OperationResolver::refresh`], reporting why the bundles could not
    /// be fetched instead of falling back.
    ///
    /// Bundles without any operation id still yield the fallback table.
    #[instrument(skip(self, http, via), fields(origin = %origin))]
    pub async fn try_refresh(
        &self,
        http: &HttpClient,
        origin: &str,
        via: Option<&EgressPath>,
    ) -> Result<BTreeMap<String, String>, FetchError> {
        let found = scan_bundles(http, origin, via).await?;
        if found.is_empty() {
            warn!("No operation ids found in client bundles, using fallback table");
            return Ok(fallback_table());
        }

        let mut ids = fallback_table();
        let discovered = found.len();
        ids.extend(found);
        let cache = OperationIdCache::new(ids.clone(), Utc::now().timestamp_millis());

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&cache).await {
                warn!(error = %e, "Failed to persist operation id cache");
            }
        }
        *self.lock() = Some(cache);

        info!(discovered, total = ids.len(), "Operation ids refreshed");
        Ok(ids)
    }
}

async fn scan_bundles(
    http: &HttpClient,
    origin: &str,
    via: Option<&EgressPath>,
) -> Result<BTreeMap<String, String>, FetchError> {
    let home = http.get_text(origin, via).await?;
    let bundles = extract_bundle_urls(&home, origin);
    if bundles.is_empty() {
        return Err(FetchError::InvalidResponse(
            "no client bundle referenced by home page".to_string(),
        ));
    }

    let mut ids = BTreeMap::new();
    for url in bundles {
        debug!(url = %url, "Scanning client bundle");
        let source = http.get_text(&url, via).await?;
        ids.extend(extract_operation_ids(&source));
    }
    Ok(ids)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use birdline_store::MemoryOperationIdStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);
    const NOW_MS: i64 = 1_700_000_000_000;

    fn cache(fetched_at: i64) -> OperationIdCache {
        let mut ids = BTreeMap::new();
        ids.insert("SearchTimeline".to_string(), "cachedSearchId".to_string());
        ids.insert("AudioSpaceById".to_string(), "cachedSpaceId".to_string());
        OperationIdCache::new(ids, fetched_at)
    }

    #[test]
    fn test_fallback_only() {
        let resolver = OperationResolver::fallback_only(DAY);
        assert_eq!(
            resolver.resolve("SearchTimeline").unwrap(),
            "nK1dw4oV3k4w5TdtcAdSww"
        );
        assert!(matches!(
            resolver.resolve("NoSuchOperation"),
            Err(FetchError::UnknownOperation(name)) if name == "NoSuchOperation"
        ));
        assert_eq!(resolver.list(), fallback_table());
    }

    #[tokio::test]
    async fn test_fresh_cache_wins() {
        let store = Arc::new(MemoryOperationIdStore::with_cache(cache(NOW_MS - 1000)));
        let resolver = OperationResolver::open(store, DAY).await;

        assert_eq!(resolver.resolve_at("SearchTimeline", NOW_MS).unwrap(), "cachedSearchId");
        assert_eq!(resolver.resolve_at("AudioSpaceById", NOW_MS).unwrap(), "cachedSpaceId");
        assert_eq!(
            resolver.resolve_at("Followers", NOW_MS).unwrap(),
            "OGScL-RC4DFMsRGOCjPR6g"
        );
    }

    #[tokio::test]
    async fn test_expired_cache_ignored() {
        let fetched_at = NOW_MS - 86_400_000;
        let store = Arc::new(MemoryOperationIdStore::with_cache(cache(fetched_at)));
        let resolver = OperationResolver::open(store, DAY).await;

        assert_eq!(
            resolver.resolve_at("SearchTimeline", NOW_MS - 1).unwrap(),
            "cachedSearchId"
        );
        assert_eq!(
            resolver.resolve_at("SearchTimeline", NOW_MS).unwrap(),
            "nK1dw4oV3k4w5TdtcAdSww"
        );
        assert!(resolver.resolve_at("AudioSpaceById", NOW_MS).is_err());

        // list shows whatever is cached, fresh or not
        assert_eq!(resolver.list().get("AudioSpaceById").map(String::as_str), Some("cachedSpaceId"));
    }

    #[test]
    fn test_extract_operation_ids() {
        let source = r#"e.exports={queryId:"abc-123",operationName:"SearchTimeline",operationType:"query"};
            e.exports={operationName:"Followers",queryId:"F_ol1",operationType:"query"}"#;
        let ids = extract_operation_ids(source);
        assert_eq!(ids.get("SearchTimeline").map(String::as_str), Some("abc-123"));
        assert_eq!(ids.get("Followers").map(String::as_str), Some("F_ol1"));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_extract_bundle_urls() {
        let html = r#"<html><script src="https://abs.twimg.com/responsive-web/client-web/main.9f2a1c.js" nonce="x"></script>
            <script type="text/javascript" src="/static/api.77e1.js"></script>
            <script src="https://abs.twimg.com/responsive-web/client-web/vendor.1a2b.js"></script>
            <script src="https://abs.twimg.com/responsive-web/client-web/main.9f2a1c.js"></script>"#;
        let urls = extract_bundle_urls(html, "https://x.com");
        assert_eq!(
            urls,
            [
                "https://abs.twimg.com/responsive-web/client-web/main.9f2a1c.js",
                "https://x.com/static/api.77e1.js",
            ]
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_returns_fallback_and_keeps_cache() {
        let store = Arc::new(MemoryOperationIdStore::with_cache(cache(NOW_MS)));
        let resolver = OperationResolver::open(store.clone(), DAY).await;
        let http = HttpClient::new().with_allowed_domains(vec!["x.com".to_string()]);

        let ids = resolver.refresh(&http, "https://blocked.invalid", None).await;
        assert_eq!(ids, fallback_table());
        assert_eq!(store.current().map(|c| c.fetched_at), Some(NOW_MS));
    }
}
