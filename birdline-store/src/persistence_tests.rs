//! Persistence edge case tests.
//!
//! Tests file I/O operations and the atomic-write behavior.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::persistence::{load_json, load_json_opt, remove_file, save_json};
use birdline_core::CursorCheckpoint;

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("resume.json");

    let data = serde_json::json!({"key": "value"});

    let result = save_json(&nested_path, &data).await;
    assert!(result.is_ok());
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_save_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resume.json");

    save_json(&path, &CursorCheckpoint::new(None)).await.unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resume.json");

    let mut cp = CursorCheckpoint::new(Some("q".to_string()));
    save_json(&path, &cp).await.unwrap();
    cp.advance(Some("next".to_string()), 5);
    save_json(&path, &cp).await.unwrap();

    let loaded: CursorCheckpoint = load_json(&path).await.unwrap();
    assert_eq!(loaded.pages_fetched, 1);
    assert_eq!(loaded.cursor.as_deref(), Some("next"));
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/resume.json");

    let result: Result<CursorCheckpoint, _> = load_json(&file_path).await;
    assert!(result.unwrap_err().is_not_found());

    let opt: Option<CursorCheckpoint> = load_json_opt(&file_path).await.unwrap();
    assert!(opt.is_none());
}

#[tokio::test]
async fn test_load_opt_surfaces_parse_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    tokio::fs::write(&path, "[1, 2").await.unwrap();

    let result: Result<Option<CursorCheckpoint>, _> = load_json_opt(&path).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_remove_missing_file_is_ok() {
    let temp_dir = TempDir::new().unwrap();
    assert!(remove_file(&temp_dir.path().join("gone.json")).await.is_ok());
}
