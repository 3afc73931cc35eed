//! Page and checkpoint types.
//!
//! - [`PageResult`] - One fetched page
//! - [`CursorCheckpoint`] - Durable resume state for a multi-page fetch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Page Result
// ============================================================================

/// One fetched page of a cursor-paginated collection.
///
/// `has_more` is only ever true when a next cursor is present; the
/// constructors enforce this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    items: Vec<T>,
    next_cursor: Option<String>,
    has_more: bool,
}

impl<T> PageResult<T> {
    /// Creates a page whose `has_more` follows the presence of a cursor.
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        let next_cursor = next_cursor.filter(|c| !c.is_empty());
        let has_more = next_cursor.is_some();
        Self {
            items,
            next_cursor,
            has_more,
        }
    }

    /// Creates a page with an explicit `has_more` flag.
    ///
    /// The flag is forced to false when no cursor is present.
    pub fn with_has_more(items: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        let mut page = Self::new(items, next_cursor);
        page.has_more = page.has_more && has_more;
        page
    }

    /// Creates a terminal page.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Items in server order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Cursor for the next page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Whether the server reports more data.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page carries no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Splits the page into its items and next cursor.
    pub fn into_parts(self) -> (Vec<T>, Option<String>, bool) {
        (self.items, self.next_cursor, self.has_more)
    }
}

// ============================================================================
// Cursor Checkpoint
// ============================================================================

/// Durable pagination progress.
///
/// Serialized as `{cursor, pagesFetched, totalItems, lastUpdated, query?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorCheckpoint {
    /// Cursor to resume from.
    pub cursor: Option<String>,
    /// Pages fetched so far, across all runs.
    pub pages_fetched: u32,
    /// Items fetched so far, across all runs.
    pub total_items: u64,
    /// When the checkpoint was last written.
    pub last_updated: DateTime<Utc>,
    /// The query the fetch was started for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl CursorCheckpoint {
    /// Creates an empty checkpoint for a query.
    pub fn new(query: Option<String>) -> Self {
        Self {
            cursor: None,
            pages_fetched: 0,
            total_items: 0,
            last_updated: Utc::now(),
            query,
        }
    }

    /// Records one more fetched page.
    pub fn advance(&mut self, cursor: Option<String>, items: usize) {
        self.cursor = cursor;
        self.pages_fetched = self.pages_fetched.saturating_add(1);
        self.total_items = self.total_items.saturating_add(items as u64);
        self.last_updated = Utc::now();
    }

    /// Returns true if this checkpoint belongs to the given query.
    ///
    /// A checkpoint written without a query matches anything.
    pub fn matches_query(&self, query: Option<&str>) -> bool {
        match (&self.query, query) {
            (Some(saved), Some(current)) => saved == current,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more_requires_cursor() {
        let page: PageResult<u32> = PageResult::with_has_more(vec![1, 2], None, true);
        assert!(!page.has_more());

        let page: PageResult<u32> = PageResult::new(vec![1], Some("c1".to_string()));
        assert!(page.has_more());
        assert_eq!(page.next_cursor(), Some("c1"));
    }

    #[test]
    fn test_empty_cursor_is_no_cursor() {
        let page: PageResult<u32> = PageResult::new(vec![], Some(String::new()));
        assert!(!page.has_more());
        assert!(page.next_cursor().is_none());
    }

    #[test]
    fn test_explicit_has_more_false_keeps_cursor() {
        let page: PageResult<u32> = PageResult::with_has_more(vec![1], Some("c".to_string()), false);
        assert!(!page.has_more());
        assert_eq!(page.next_cursor(), Some("c"));
    }

    #[test]
    fn test_checkpoint_advance() {
        let mut cp = CursorCheckpoint::new(Some("rust".to_string()));
        cp.advance(Some("c1".to_string()), 20);
        cp.advance(Some("c2".to_string()), 15);
        assert_eq!(cp.pages_fetched, 2);
        assert_eq!(cp.total_items, 35);
        assert_eq!(cp.cursor.as_deref(), Some("c2"));
    }

    #[test]
    fn test_checkpoint_query_match() {
        let cp = CursorCheckpoint::new(Some("rust".to_string()));
        assert!(cp.matches_query(Some("rust")));
        assert!(!cp.matches_query(Some("go")));
        assert!(cp.matches_query(None));
        assert!(CursorCheckpoint::new(None).matches_query(Some("anything")));
    }
}
