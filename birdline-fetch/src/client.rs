//! Request orchestration.
//!
//! Every API call goes through [`ApiClient`]. Per call it:
//!
//! 1. resolves the operation's query id
//! 2. sleeps a random jitter
//! 3. waits out the endpoint's rate limit
//! 4. takes the next credential and builds headers with a fresh transaction id
//! 5. takes the next egress path and sends the request
//! 6. feeds the response's quota headers back to the limiter and the pool
//! 7. updates egress health and maps transport and API errors
//! 8. hands the payload to the caller's parser

use birdline_core::{Credential, CoreError, PageResult};
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::context::FetchContext;
use crate::credentials::is_hard_lockout;
use crate::egress::EgressPath;
use crate::error::{FetchError, HttpError};
use crate::host::http::ResponseExt;
use crate::operations::fallback_table;
use crate::tagging::generate_tag_for;
use crate::timeline::parse_timeline_page;

/// Feature switches the web client sends with timeline queries.
pub fn default_features() -> Value {
    json!({
        "rweb_tipjar_consumption_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "communities_web_enable_tweet_community_results_fetch": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "articles_preview_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_enhance_cards_enabled": false
    })
}

/// Messages and codes of an `errors` array, if the payload has one.
pub fn api_errors(payload: &Value) -> Option<(Vec<String>, Vec<i64>)> {
    let errors = payload.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let messages = errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string()
        })
        .collect();
    let codes = errors
        .iter()
        .filter_map(|e| e.get("code").and_then(Value::as_i64))
        .collect();
    Some((messages, codes))
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| {
        FetchError::Core(CoreError::InvalidCredential(format!(
            "{what} is not a valid header value"
        )))
    })
}

// ============================================================================
// API Client
// ============================================================================

/// The request orchestrator.
#[derive(Debug, Clone)]
pub struct ApiClient {
    ctx: Arc<FetchContext>,
}

impl ApiClient {
    /// Creates a client over a fetch context.
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Creates a client sharing an existing context.
    pub fn from_shared(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    /// Returns the fetch context.
    pub fn context(&self) -> &FetchContext {
        &self.ctx
    }

    /// Runs a GraphQL query with the default feature switches.
    ///
    /// `parse` receives the payload's `data` object.
    pub async fn graphql<T, P>(
        &self,
        operation: &str,
        variables: &Value,
        parse: P,
    ) -> Result<T, FetchError>
    where
        P: FnOnce(&Value) -> Result<T, FetchError>,
    {
        self.graphql_with_features(operation, variables, &default_features(), parse)
            .await
    }

    /// Runs a GraphQL query with explicit feature switches.
    #[instrument(skip(self, variables, features, parse), fields(operation = %operation))]
    pub async fn graphql_with_features<T, P>(
        &self,
        operation: &str,
        variables: &Value,
        features: &Value,
        parse: P,
    ) -> Result<T, FetchError>
    where
        P: FnOnce(&Value) -> Result<T, FetchError>,
    {
        let query_id = self.ctx.operations.resolve(operation)?;
        let mut url = Url::parse(&self.ctx.settings.graphql_url(&query_id, operation))
            .map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("variables", &variables.to_string())
            .append_pair("features", &features.to_string());

        let payload = self.dispatch(operation, url).await?;
        let data = payload
            .get("data")
            .ok_or_else(|| FetchError::InvalidResponse("response has no data".to_string()))?;
        parse(data)
    }

    /// Runs a GraphQL query and returns its `data` object.
    pub async fn graphql_data(
        &self,
        operation: &str,
        variables: &Value,
    ) -> Result<Value, FetchError> {
        self.graphql(operation, variables, |data| Ok(data.clone())).await
    }

    /// Fetches one page of a timeline operation.
    ///
    /// The cursor is merged into `variables` as `"cursor"`.
    pub async fn timeline_page(
        &self,
        operation: &str,
        variables: &Value,
        cursor: Option<String>,
    ) -> Result<PageResult<Value>, FetchError> {
        let mut variables = variables.clone();
        if let (Some(cursor), Some(map)) = (cursor, variables.as_object_mut()) {
            map.insert("cursor".to_string(), Value::String(cursor));
        }
        self.graphql(operation, &variables, |data| Ok(parse_timeline_page(data)))
            .await
    }

    /// Calls a REST endpoint, e.g. `1.1/friends/list.json`.
    ///
    /// The path doubles as the rate-limit key; `parse` receives the whole body.
    #[instrument(skip(self, query, parse), fields(path = %path))]
    pub async fn rest_get<T, P>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        parse: P,
    ) -> Result<T, FetchError>
    where
        P: FnOnce(&Value) -> Result<T, FetchError>,
    {
        let mut url = Url::parse(&self.ctx.settings.rest_url(path))
            .map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let endpoint = path.trim_start_matches('/');
        let payload = self.dispatch(endpoint, url).await?;
        parse(&payload)
    }

    /// Refreshes the operation id cache through the next egress path.
    ///
    /// Falls back to the built-in table on failure. The path's health is
    /// updated like any other dispatch.
    pub async fn refresh_operations(&self) -> BTreeMap<String, String> {
        let path = self.ctx.egress.next();
        let result = self
            .ctx
            .operations
            .try_refresh(&self.ctx.http, &self.ctx.settings.web_origin, path.as_ref())
            .await;

        match result {
            Ok(ids) => {
                if let Some(path) = &path {
                    self.ctx.egress.mark_success(path);
                }
                ids
            }
            Err(e) => {
                if matches!(
                    e,
                    FetchError::Http(HttpError::Request(_) | HttpError::Proxy { .. })
                ) {
                    self.egress_failed(path.as_ref());
                }
                warn!(error = %e, "Operation id refresh failed, using fallback table");
                fallback_table()
            }
        }
    }

    async fn jitter(&self) {
        let max_ms = u64::try_from(self.ctx.settings.jitter_max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(0..=max_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    fn headers(&self, credential: &Credential, url: &Url) -> Result<HeaderMap, FetchError> {
        let settings = &self.ctx.settings;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header_value(&format!("Bearer {}", settings.bearer_token), "bearer token")?,
        );
        headers.insert(
            HeaderName::from_static("x-csrf-token"),
            header_value(&credential.ct0, "ct0")?,
        );
        headers.insert(header::COOKIE, header_value(&credential.cookie_header(), "cookie")?);
        headers.insert(
            HeaderName::from_static("x-twitter-auth-type"),
            HeaderValue::from_static("OAuth2Session"),
        );
        headers.insert(
            HeaderName::from_static("x-twitter-active-user"),
            HeaderValue::from_static("yes"),
        );
        headers.insert(
            HeaderName::from_static("x-twitter-client-language"),
            HeaderValue::from_static("en"),
        );
        headers.insert(
            HeaderName::from_static("x-client-transaction-id"),
            header_value(&generate_tag_for("GET", url.path()), "transaction id")?,
        );
        headers.insert(header::USER_AGENT, header_value(&settings.user_agent, "user agent")?);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(origin) = HeaderValue::from_str(&settings.web_origin) {
            headers.insert(header::ORIGIN, origin.clone());
            headers.insert(header::REFERER, origin);
        }
        Ok(headers)
    }

    fn egress_failed(&self, path: Option<&EgressPath>) {
        if let Some(path) = path {
            self.ctx.egress.mark_failed(path);
        }
    }

    /// Sends one GET through the pipeline and returns the JSON payload.
    async fn dispatch(&self, endpoint: &str, url: Url) -> Result<Value, FetchError> {
        self.jitter().await;
        self.ctx.limiter.wait_if_needed(endpoint).await;

        let credential = self.ctx.credentials.next().ok_or(FetchError::NoCredentials)?;
        let headers = self.headers(&credential, &url)?;
        let path = self.ctx.egress.next();

        debug!(
            endpoint,
            credential = %credential.label(),
            proxy = path.as_ref().map_or("direct", EgressPath::uri),
            "Dispatching request"
        );

        let response = match self.ctx.http.get(url.as_str(), headers, path.as_ref()).await {
            Ok(response) => response,
            Err(HttpError::Request(e)) => {
                self.egress_failed(path.as_ref());
                warn!(endpoint, error = %e, "Request failed");
                return Err(FetchError::network(&e));
            }
            Err(e @ HttpError::Proxy { .. }) => {
                self.egress_failed(path.as_ref());
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        let rate = response.rate_state();
        let has_rate_headers = response.has_rate_headers();
        if let Some(rate) = rate {
            self.ctx.limiter.update(endpoint, rate);
            self.ctx.credentials.record_rate_state(&credential, endpoint, rate);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.egress_failed(path.as_ref());
                return Err(FetchError::network(&e));
            }
        };

        if !status.is_success() {
            self.egress_failed(path.as_ref());
            let codes = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| api_errors(&v))
                .map(|(_, codes)| codes)
                .unwrap_or_default();
            if is_hard_lockout(Some(status.as_u16()), has_rate_headers, &codes) {
                self.ctx.credentials.mark_limited(
                    &credential,
                    endpoint,
                    rate.and_then(|r| r.reset_at()),
                );
            }
            warn!(endpoint, status = status.as_u16(), "Request rejected");
            return Err(FetchError::http_status(status.as_u16(), &body));
        }

        if let Some(path) = &path {
            self.ctx.egress.mark_success(path);
        }

        let payload: Value = serde_json::from_str(&body)?;
        if let Some((messages, codes)) = api_errors(&payload) {
            if is_hard_lockout(Some(status.as_u16()), has_rate_headers, &codes) {
                self.ctx.credentials.mark_limited(
                    &credential,
                    endpoint,
                    rate.and_then(|r| r.reset_at()),
                );
            }
            warn!(endpoint, ?codes, "API reported errors");
            return Err(FetchError::RemoteApi { messages, codes });
        }

        Ok(payload)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FetchSettings;
    use crate::credentials::CredentialPool;

    fn client_with(credentials: CredentialPool) -> ApiClient {
        ApiClient::new(
            FetchContext::builder()
                .settings(FetchSettings::default().with_jitter_max(Duration::ZERO))
                .credentials(Arc::new(credentials))
                .build(),
        )
    }

    #[test]
    fn test_api_errors() {
        let payload = json!({
            "errors": [
                {"message": "Rate limit exceeded", "code": 88},
                {"message": "Account locked", "code": 326},
                {"code": 0}
            ]
        });
        let (messages, codes) = api_errors(&payload).unwrap();
        assert_eq!(messages, ["Rate limit exceeded", "Account locked", "unknown error"]);
        assert_eq!(codes, [88, 326, 0]);

        assert!(api_errors(&json!({"data": {}})).is_none());
        assert!(api_errors(&json!({"errors": []})).is_none());
    }

    #[test]
    fn test_headers() {
        let client = client_with(CredentialPool::new());
        let credential = Credential::new("tok", "csrf");
        let url = Url::parse("https://x.com/i/api/graphql/abc/SearchTimeline").unwrap();

        let headers = client.headers(&credential, &url).unwrap();
        assert_eq!(headers["x-csrf-token"], "csrf");
        assert_eq!(headers[header::COOKIE], "auth_token=tok; ct0=csrf");
        assert!(headers[header::AUTHORIZATION].to_str().unwrap().starts_with("Bearer AAAA"));
        assert_eq!(headers["x-twitter-auth-type"], "OAuth2Session");
        assert!(!headers["x-client-transaction-id"].is_empty());

        let again = client.headers(&credential, &url).unwrap();
        assert_ne!(headers["x-client-transaction-id"], again["x-client-transaction-id"]);
    }

    #[test]
    fn test_headers_reject_control_chars() {
        let client = client_with(CredentialPool::new());
        let credential = Credential::new("tok", "bad\nct0");
        let url = Url::parse("https://x.com/").unwrap();
        assert!(client.headers(&credential, &url).is_err());
    }

    #[tokio::test]
    async fn test_unknown_operation_is_not_dispatched() {
        let client = client_with(CredentialPool::new());
        let err = client
            .graphql_data("NoSuchOperation", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnknownOperation(_)));
    }

    #[tokio::test]
    async fn test_empty_pool_fails_fast() {
        let client = client_with(CredentialPool::new());
        let err = client
            .graphql_data("SearchTimeline", &json!({"rawQuery": "rust"}))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoCredentials));
    }
}
