//! Integration tests for core model types.

use birdline_core::{Credential, CursorCheckpoint, EndpointRateState, OperationIdCache, PageResult};
use std::collections::BTreeMap;

#[test]
fn test_checkpoint_file_format() {
    let json = r#"{
        "cursor": "DAACCgACGRElM",
        "pagesFetched": 4,
        "totalItems": 80,
        "lastUpdated": "2026-03-01T12:00:00Z",
        "query": "from:jack"
    }"#;
    let checkpoint: CursorCheckpoint = serde_json::from_str(json).unwrap();
    assert_eq!(checkpoint.pages_fetched, 4);
    assert!(checkpoint.matches_query(Some("from:jack")));
    assert!(!checkpoint.matches_query(Some("from:bob")));

    let out = serde_json::to_value(&checkpoint).unwrap();
    assert_eq!(out["totalItems"], 80);
    assert_eq!(out["cursor"], "DAACCgACGRElM");
}

#[test]
fn test_checkpoint_advance_accumulates() {
    let mut checkpoint = CursorCheckpoint::new(None);
    checkpoint.advance(Some("a".to_string()), 20);
    checkpoint.advance(Some("b".to_string()), 15);
    assert_eq!(checkpoint.pages_fetched, 2);
    assert_eq!(checkpoint.total_items, 35);
    assert_eq!(checkpoint.cursor.as_deref(), Some("b"));
    assert!(checkpoint.matches_query(Some("anything")));
}

#[test]
fn test_page_without_cursor_is_last() {
    let page = PageResult::with_has_more(vec![1, 2, 3], None, true);
    assert!(!page.has_more());

    let page = PageResult::new(vec![1], Some(String::new()));
    assert!(page.next_cursor().is_none());
    assert!(!page.has_more());
}

#[test]
fn test_operation_cache_ttl() {
    let mut ids = BTreeMap::new();
    ids.insert("SearchTimeline".to_string(), "abc".to_string());
    let cache = OperationIdCache::new(ids, 1_000);
    let day = 86_400_000;

    assert!(cache.is_fresh_at(1_000 + day - 1, day));
    assert!(!cache.is_fresh_at(1_000 + day, day));
    assert_eq!(cache.get("SearchTimeline"), Some("abc"));
}

#[test]
fn test_rate_state_staleness() {
    let state = EndpointRateState::new(50, 0, 1_700_000_000);
    assert!(state.is_exhausted());
    assert!(!state.is_stale_at(1_700_000_000_000));
    assert!(state.is_stale_at(1_700_000_000_001));
}

#[test]
fn test_credential_requires_both_tokens() {
    assert!(Credential::new("token", "ct0").is_valid());
    assert!(!Credential::new("token", "").is_valid());
    assert!(!Credential::new("", "ct0").is_valid());
}
