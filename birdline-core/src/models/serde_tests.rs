//! Serde tests for the persisted record formats.
//!
//! The checkpoint and operation-id files are read by earlier and later
//! versions of the tool, so their field names are pinned here.

use chrono::{TimeZone, Utc};

use crate::{Credential, CursorCheckpoint, OperationIdCache};

#[test]
fn test_checkpoint_field_names() {
    let cp = CursorCheckpoint {
        cursor: Some("DAABCgAB".to_string()),
        pages_fetched: 3,
        total_items: 57,
        last_updated: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        query: Some("from:jack".to_string()),
    };

    let json = serde_json::to_value(&cp).unwrap();
    assert_eq!(json["cursor"], "DAABCgAB");
    assert_eq!(json["pagesFetched"], 3);
    assert_eq!(json["totalItems"], 57);
    assert_eq!(json["lastUpdated"], "2026-01-02T03:04:05Z");
    assert_eq!(json["query"], "from:jack");
}

#[test]
fn test_checkpoint_without_query() {
    let json = r#"{"cursor":null,"pagesFetched":1,"totalItems":20,"lastUpdated":"2026-01-02T03:04:05Z"}"#;
    let cp: CursorCheckpoint = serde_json::from_str(json).unwrap();
    assert!(cp.query.is_none());
    assert!(cp.cursor.is_none());
    assert_eq!(cp.pages_fetched, 1);
}

#[test]
fn test_operation_cache_format() {
    let json = r#"{"ids":{"SearchTimeline":"abc123"},"fetchedAt":1700000000000}"#;
    let cache: OperationIdCache = serde_json::from_str(json).unwrap();
    assert_eq!(cache.get("SearchTimeline"), Some("abc123"));
    assert_eq!(cache.fetched_at, 1_700_000_000_000);
}

#[test]
fn test_credential_camel_case() {
    let json = r#"{"authToken":"a","ct0":"b","username":"jack"}"#;
    let cred: Credential = serde_json::from_str(json).unwrap();
    assert_eq!(cred.auth_token, "a");
    assert_eq!(cred.ct0, "b");
    assert_eq!(cred.username.as_deref(), Some("jack"));
    assert!(cred.user_id.is_none());
}

#[test]
fn test_credential_accepts_cookie_names() {
    let json = r#"{"auth_token":"a","ct0":"b","user_id":"12"}"#;
    let cred: Credential = serde_json::from_str(json).unwrap();
    assert_eq!(cred.auth_token, "a");
    assert_eq!(cred.user_id.as_deref(), Some("12"));
}
