//! HTTP client with tracing, domain allowlist and per-proxy clients.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Domain allowlist so credentials only travel to the API hosts
//! - One pooled `reqwest::Client` per egress path

use birdline_core::EndpointRateState;
use reqwest::{Client, Proxy, Response, header::HeaderMap};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::context::FetchSettings;
use crate::egress::EgressPath;
use crate::error::HttpError;
use crate::ratelimit::{has_rate_headers, parse_rate_headers};

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Hosts the web client talks to.
const API_DOMAINS: &[&str] = &["x.com", "twitter.com", "twimg.com"];

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing, proxy routing and domain allowlist.
#[derive(Debug)]
pub struct HttpClient {
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
    allowed_domains: Option<Vec<String>>,
    timeout: Duration,
    user_agent: String,
}

fn build_client(
    timeout: Duration,
    user_agent: &str,
    proxy: Option<Proxy>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().timeout(timeout).user_agent(user_agent);
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder.build()
}

impl HttpClient {
    /// Creates a new HTTP client with default settings and no allowlist.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This should only occur
    /// if the system's TLS configuration is fundamentally broken, making
    /// network operations impossible.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(timeout, crate::context::DEFAULT_USER_AGENT, None)
    }

    /// Creates the client used by the request pipeline.
    ///
    /// Requests are restricted to the API hosts plus the configured origin.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built, see [`HttpClient::with_timeout`].
    pub fn for_settings(settings: &FetchSettings) -> Self {
        let mut domains: Vec<String> = API_DOMAINS.iter().map(|d| (*d).to_string()).collect();
        for base in [&settings.web_origin, &settings.api_base] {
            if let Some(host) = Url::parse(base).ok().and_then(|u| u.host_str().map(str::to_string))
            {
                if !domains.contains(&host) {
                    domains.push(host);
                }
            }
        }
        Self::build(settings.timeout, &settings.user_agent, Some(domains))
    }

    fn build(timeout: Duration, user_agent: &str, allowed_domains: Option<Vec<String>>) -> Self {
        let client = build_client(timeout, user_agent, None).unwrap_or_else(|e| {
            panic!(
                "Failed to create HTTP client: {e}. \
                This usually indicates a broken TLS configuration."
            )
        });

        Self {
            direct: client,
            proxied: Mutex::new(HashMap::new()),
            allowed_domains,
            timeout,
            user_agent: user_agent.to_string(),
        }
    }

    /// Restricts requests to the given domains and their subdomains.
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let Some(ref allowed) = self.allowed_domains else {
            return Ok(());
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Returns the client that routes through `path`, or the direct client.
    ///
    /// Proxied clients are built once per normalized URI and reused.
    pub fn client_for(&self, path: Option<&EgressPath>) -> Result<Client, HttpError> {
        let Some(path) = path else {
            return Ok(self.direct.clone());
        };

        let mut cache = self.proxied.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = cache.get(path.uri()) {
            return Ok(client.clone());
        }

        let proxy_error = |e: reqwest::Error| HttpError::Proxy {
            uri: path.uri().to_string(),
            reason: e.to_string(),
        };
        let proxy = Proxy::all(path.proxy_url()).map_err(proxy_error)?;
        let client =
            build_client(self.timeout, &self.user_agent, Some(proxy)).map_err(proxy_error)?;

        debug!(proxy = %path.uri(), "Built proxied HTTP client");
        cache.insert(path.uri().to_string(), client.clone());
        Ok(client)
    }

    /// Performs a GET request with custom headers.
    #[instrument(skip(self, headers, via), fields(url = %url, proxy = tracing::field::Empty))]
    pub async fn get(
        &self,
        url: &str,
        headers: HeaderMap,
        via: Option<&EgressPath>,
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        if let Some(path) = via {
            tracing::Span::current().record("proxy", path.uri());
        }
        let client = self.client_for(via)?;
        debug!("GET request");

        let response = client.get(url).headers(headers).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Fetches a page body as text, failing on non-2xx statuses.
    #[instrument(skip(self, via), fields(url = %url))]
    pub async fn get_text(&self, url: &str, via: Option<&EgressPath>) -> Result<String, HttpError> {
        let response = self.get(url, HeaderMap::new(), via).await?;
        let body = response.error_for_status()?.text().await?;
        debug!(bytes = body.len(), "Body received");
        Ok(body)
    }

    /// Number of proxied clients built so far.
    pub fn proxied_clients(&self) -> usize {
        self.proxied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Quota reported in the `x-rate-limit-*` headers.
    fn rate_state(&self) -> Option<EndpointRateState>;

    /// Whether any `x-rate-limit-*` header is present.
    fn has_rate_headers(&self) -> bool;
}

impl ResponseExt for Response {
    fn rate_state(&self) -> Option<EndpointRateState> {
        parse_rate_headers(self.headers())
    }

    fn has_rate_headers(&self) -> bool {
        has_rate_headers(self.headers())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::egress::parse_path_spec;

    #[test]
    fn test_pipeline_allowlist() {
        let client = HttpClient::for_settings(&FetchSettings::default());

        assert!(client.is_domain_allowed("https://x.com/i/api/graphql/a/B").is_ok());
        assert!(client.is_domain_allowed("https://api.twitter.com/1.1/x.json").is_ok());
        assert!(client.is_domain_allowed("https://abs.twimg.com/main.js").is_ok());
        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
        assert!(client.is_domain_allowed("https://notx.com/").is_err());
    }

    #[test]
    fn test_allowlist_includes_custom_origin() {
        let settings = FetchSettings::default().with_base_url("http://birdline.test");
        let client = HttpClient::for_settings(&settings);
        assert!(client.is_domain_allowed("http://birdline.test/i/api/x").is_ok());
    }

    #[test]
    fn test_no_domain_restrictions() {
        let client = HttpClient::new();
        assert!(client.is_domain_allowed("https://any.domain.com").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new().with_allowed_domains(vec!["example.com".to_string()]);
        assert!(client.is_domain_allowed("not-a-valid-url").is_err());
        assert!(client.is_domain_allowed("https://evil.com/path").is_err());
    }

    #[test]
    fn test_proxied_clients_are_reused() {
        let client = HttpClient::new();
        let a = parse_path_spec("127.0.0.1:8080").unwrap();
        let b = parse_path_spec("socks5://user:pw@127.0.0.1:1080").unwrap();

        assert!(client.client_for(None).is_ok());
        assert_eq!(client.proxied_clients(), 0);

        client.client_for(Some(&a)).unwrap();
        client.client_for(Some(&a)).unwrap();
        client.client_for(Some(&b)).unwrap();
        assert_eq!(client.proxied_clients(), 2);
    }
}
