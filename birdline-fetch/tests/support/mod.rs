//! Shared fixtures for pipeline tests.
//!
//! Tests run against an `httpmock` server. When a test needs an egress path
//! the same server is registered as the proxy, so requests reach it in
//! absolute form and still match on path and query.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use birdline_core::Credential;
use birdline_fetch::{ApiClient, CredentialPool, EgressManager, FetchContext, FetchSettings};
use httpmock::prelude::*;
use httpmock::{Mock, Then};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Fallback query id of `SearchTimeline`.
pub const SEARCH_PATH: &str = "/i/api/graphql/nK1dw4oV3k4w5TdtcAdSww/SearchTimeline";

/// Cookie sent for [`credential`] `n`.
pub fn cookie(n: u32) -> String {
    format!("auth_token=token{n}; ct0=ct0-{n}")
}

pub fn credential(n: u32) -> Credential {
    Credential::new(format!("token{n}"), format!("ct0-{n}"))
}

/// Egress spec pointing at the mock server itself.
pub fn proxy_spec(server: &MockServer) -> String {
    format!("http://{}", server.address())
}

/// Returns a local port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn settings(base_url: &str) -> FetchSettings {
    FetchSettings::default()
        .with_base_url(base_url)
        .with_jitter_max(Duration::ZERO)
        .with_page_delay(Duration::from_millis(100))
        .with_timeout(Duration::from_secs(5))
}

/// A client with `credentials` sessions routed through `proxies`.
pub fn client(credentials: u32, proxies: &[String], settings: FetchSettings) -> ApiClient {
    let pool = CredentialPool::from_credentials((0..credentials).map(credential));
    let egress =
        EgressManager::with_policy(settings.egress_failure_threshold, settings.egress_cooldown);
    for spec in proxies {
        egress.register(spec).unwrap();
    }
    ApiClient::new(
        FetchContext::builder()
            .settings(settings)
            .credentials(Arc::new(pool))
            .egress(Arc::new(egress))
            .build(),
    )
}

/// The `variables` query parameter the client sends for `cursor`.
pub fn variables_param(variables: &Value, cursor: Option<&str>) -> String {
    let mut variables = variables.clone();
    if let (Some(cursor), Some(map)) = (cursor, variables.as_object_mut()) {
        map.insert("cursor".to_string(), json!(cursor));
    }
    variables.to_string()
}

/// Adds quota headers with `remaining` calls left.
pub fn with_quota(then: Then, remaining: u32) -> Then {
    let reset = chrono::Utc::now().timestamp() + 900;
    then.header("x-rate-limit-limit", "150")
        .header("x-rate-limit-remaining", remaining.to_string())
        .header("x-rate-limit-reset", reset.to_string())
}

pub fn tweet(id: u32) -> Value {
    json!({
        "entryId": format!("tweet-{id}"),
        "content": {
            "entryType": "TimelineTimelineItem",
            "itemContent": {"tweet_results": {"result": {"rest_id": id.to_string()}}}
        }
    })
}

pub fn bottom_cursor(value: &str) -> Value {
    json!({
        "entryId": format!("cursor-bottom-{value}"),
        "content": {
            "entryType": "TimelineTimelineCursor",
            "value": value,
            "cursorType": "Bottom"
        }
    })
}

/// A SearchTimeline payload with the given entries.
pub fn search_page(entries: Vec<Value>) -> Value {
    json!({
        "data": {
            "search_by_raw_query": {
                "search_timeline": {
                    "timeline": {
                        "instructions": [
                            {"type": "TimelineAddEntries", "entries": entries}
                        ]
                    }
                }
            }
        }
    })
}

/// The three pages of a search: 2, 3 and 1 items.
pub fn three_pages() -> [(Option<&'static str>, Value); 3] {
    [
        (None, search_page(vec![tweet(1), tweet(2), bottom_cursor("c1")])),
        (
            Some("c1"),
            search_page(vec![tweet(3), tweet(4), tweet(5), bottom_cursor("c2")]),
        ),
        (Some("c2"), search_page(vec![tweet(6)])),
    ]
}

/// Mocks one search page for `variables` at `cursor`.
pub fn mock_search_page<'a>(
    server: &'a MockServer,
    variables: &Value,
    cursor: Option<&str>,
    body: Value,
) -> Mock<'a> {
    let param = variables_param(variables, cursor);
    server.mock(|when, then| {
        when.method(Method::GET)
            .path(SEARCH_PATH)
            .query_param("variables", param);
        with_quota(then.status(200), 100).json_body(body);
    })
}
