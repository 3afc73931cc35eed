//! Fetch context bundling the shared request-pipeline state.
//!
//! The context is handed to the [`ApiClient`](crate::client::ApiClient) and
//! gives it access to the HTTP host client, the rate limiter, the egress
//! manager, the credential pool and the operation id resolver.

use std::sync::Arc;
use std::time::Duration;

use crate::credentials::CredentialPool;
use crate::egress::EgressManager;
use crate::host::http::HttpClient;
use crate::operations::OperationResolver;
use crate::ratelimit::RateLimiter;

/// Bearer token of the public web client.
pub const WEB_BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

/// Default API root for GraphQL and REST calls.
pub const DEFAULT_API_BASE: &str = "https://x.com/i/api";

/// Default web origin, used for the home page and as request origin.
pub const DEFAULT_WEB_ORIGIN: &str = "https://x.com";

/// Browser user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Timeout for every network call.
    pub timeout: Duration,
    /// Courtesy delay between pages.
    pub page_delay: Duration,
    /// Upper bound of the random pre-request jitter.
    pub jitter_max: Duration,
    /// How long a refreshed operation id cache stays valid.
    pub operation_ttl: Duration,
    /// Consecutive failures before an egress path is disabled.
    pub egress_failure_threshold: u32,
    /// How long a disabled egress path stays out of rotation.
    pub egress_cooldown: Duration,
    /// Bearer token sent in the authorization header.
    pub bearer_token: String,
    /// API root, e.g. `https://x.com/i/api`.
    pub api_base: String,
    /// Web origin, e.g. `https://x.com`.
    pub web_origin: String,
    /// User agent header.
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            page_delay: Duration::from_millis(1000),
            jitter_max: Duration::from_millis(200),
            operation_ttl: Duration::from_secs(24 * 60 * 60),
            egress_failure_threshold: 3,
            egress_cooldown: Duration::from_secs(5 * 60),
            bearer_token: WEB_BEARER_TOKEN.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            web_origin: DEFAULT_WEB_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchSettings {
    /// Sets the network timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the delay between pages.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Sets the jitter ceiling. Zero disables jitter.
    pub fn with_jitter_max(mut self, jitter: Duration) -> Self {
        self.jitter_max = jitter;
        self
    }

    /// Sets the operation id cache lifetime.
    pub fn with_operation_ttl(mut self, ttl: Duration) -> Self {
        self.operation_ttl = ttl;
        self
    }

    /// Sets the egress health policy.
    pub fn with_egress_policy(mut self, failure_threshold: u32, cooldown: Duration) -> Self {
        self.egress_failure_threshold = failure_threshold;
        self.egress_cooldown = cooldown;
        self
    }

    /// Sets the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = token.into();
        self
    }

    /// Points API calls and the web origin at `base`.
    ///
    /// `base` is the web origin; the API root becomes `{base}/i/api`.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.web_origin = base.to_string();
        self.api_base = format!("{base}/i/api");
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// URL of a GraphQL operation.
    pub fn graphql_url(&self, query_id: &str, operation: &str) -> String {
        format!("{}/graphql/{query_id}/{operation}", self.api_base)
    }

    /// URL of a REST path, e.g. `1.1/friends/list.json`.
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Shared state every API call passes through.
pub struct FetchContext {
    /// HTTP client with domain allowlist and per-proxy clients.
    pub http: Arc<HttpClient>,
    /// Per-endpoint quota tracker.
    pub limiter: Arc<RateLimiter>,
    /// Proxy rotation.
    pub egress: Arc<EgressManager>,
    /// Authenticated sessions.
    pub credentials: Arc<CredentialPool>,
    /// Operation name to query id mapping.
    pub operations: Arc<OperationResolver>,
    /// Fetch settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Returns the effective timeout for network calls.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("settings", &self.settings)
            .field("egress_paths", &self.egress.len())
            .field("credentials", &self.credentials.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Default)]
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    limiter: Option<Arc<RateLimiter>>,
    egress: Option<Arc<EgressManager>>,
    credentials: Option<Arc<CredentialPool>>,
    operations: Option<Arc<OperationResolver>>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the rate limiter.
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Sets the egress manager.
    pub fn egress(mut self, egress: Arc<EgressManager>) -> Self {
        self.egress = Some(egress);
        self
    }

    /// Sets the credential pool.
    pub fn credentials(mut self, credentials: Arc<CredentialPool>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the operation resolver.
    pub fn operations(mut self, operations: Arc<OperationResolver>) -> Self {
        self.operations = Some(operations);
        self
    }

    /// Sets the fetch settings.
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Builds the fetch context.
    ///
    /// Components that were not supplied are created from the settings.
    /// A default resolver has no cache store and serves the fallback table.
    pub fn build(self) -> FetchContext {
        let settings = self.settings;
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(HttpClient::for_settings(&settings)));
        let egress = self.egress.unwrap_or_else(|| {
            Arc::new(EgressManager::with_policy(
                settings.egress_failure_threshold,
                settings.egress_cooldown,
            ))
        });
        let operations = self.operations.unwrap_or_else(|| {
            Arc::new(OperationResolver::fallback_only(settings.operation_ttl))
        });

        FetchContext {
            http,
            limiter: self.limiter.unwrap_or_default(),
            egress,
            credentials: self.credentials.unwrap_or_default(),
            operations,
            settings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FetchSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.page_delay, Duration::from_millis(1000));
        assert_eq!(settings.jitter_max, Duration::from_millis(200));
        assert_eq!(settings.operation_ttl, Duration::from_millis(86_400_000));
        assert_eq!(settings.egress_failure_threshold, 3);
        assert_eq!(settings.egress_cooldown, Duration::from_millis(300_000));
    }

    #[test]
    fn test_urls() {
        let settings = FetchSettings::default();
        assert_eq!(
            settings.graphql_url("abc123", "SearchTimeline"),
            "https://x.com/i/api/graphql/abc123/SearchTimeline"
        );
        assert_eq!(
            settings.rest_url("/1.1/friends/list.json"),
            "https://x.com/i/api/1.1/friends/list.json"
        );
    }

    #[test]
    fn test_with_base_url() {
        let settings = FetchSettings::default().with_base_url("http://birdline.test/");
        assert_eq!(settings.web_origin, "http://birdline.test");
        assert_eq!(settings.api_base, "http://birdline.test/i/api");
    }

    #[test]
    fn test_context_builder() {
        let ctx = FetchContext::builder()
            .settings(FetchSettings::default().with_egress_policy(5, Duration::from_secs(10)))
            .timeout(Duration::from_secs(60))
            .build();

        assert_eq!(ctx.timeout(), Duration::from_secs(60));
        assert_eq!(ctx.egress.failure_threshold(), 5);
        assert!(ctx.credentials.is_empty());
        assert!(ctx.operations.resolve("SearchTimeline").is_ok());
    }
}
