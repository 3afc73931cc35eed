//! Resumable cursor pagination.
//!
//! The [`Paginator`] drives a caller-supplied page-fetch function, one page
//! at a time, and writes a [`CursorCheckpoint`] after every page so an
//! interrupted fetch can continue where it stopped. A fetch that runs out
//! of pages deletes its checkpoint; one that stops at the page cap keeps it.

use birdline_core::{CheckpointStore, CursorCheckpoint, PageResult};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;

/// Default courtesy delay between pages.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// Page Limit
// ============================================================================

/// How many pages one run may fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// At most this many pages (at least 1).
    Pages(u32),
    /// Until the collection is exhausted.
    All,
}

impl PageLimit {
    /// A cap of `n` pages, raised to 1 if zero.
    pub fn pages(n: u32) -> Self {
        Self::Pages(n.max(1))
    }

    fn reached(self, fetched: u32) -> bool {
        match self {
            Self::Pages(n) => fetched >= n.max(1),
            Self::All => false,
        }
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self::Pages(1)
    }
}

impl FromStr for PageLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match s.parse::<u32>() {
            Ok(0) => Err("page count must be at least 1".to_string()),
            Ok(n) => Ok(Self::Pages(n)),
            Err(_) => Err(format!("expected a page count or 'all', got '{s}'")),
        }
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pages(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No further cursor.
    Exhausted,
    /// The page cap was reached with more data remaining.
    Capped,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct PaginationOutcome<T> {
    /// Items fetched in this run, in order.
    pub items: Vec<T>,
    /// Pages fetched in this run.
    pub pages: u32,
    /// Pages fetched across all runs, including resumed ones.
    pub total_pages: u32,
    /// Whether the run continued from a checkpoint.
    pub resumed: bool,
    /// Why the run stopped.
    pub stop: StopReason,
    /// Cursor of the next page, if any.
    pub next_cursor: Option<String>,
    /// Checkpoint location to resume from, when one was kept.
    pub resume_from: Option<String>,
}

impl<T> PaginationOutcome<T> {
    /// Whether the collection has more pages.
    pub fn has_more(&self) -> bool {
        self.stop == StopReason::Capped
    }
}

/// A run that stopped on an error, with what it fetched before.
#[derive(Debug)]
pub struct PaginationFailure<T> {
    /// The error that stopped the run.
    pub error: FetchError,
    /// Items fetched before the error.
    pub items: Vec<T>,
    /// Pages fetched before the error.
    pub pages: u32,
    /// Checkpoint location to resume from.
    pub resume_from: Option<String>,
}

impl<T> fmt::Display for PaginationFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} page(s)", self.error, self.pages)?;
        if let Some(location) = &self.resume_from {
            write!(f, ", resume from {location}")?;
        }
        Ok(())
    }
}

impl<T: fmt::Debug> std::error::Error for PaginationFailure<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ============================================================================
// Paginator
// ============================================================================

/// Drives a page-fetch function with checkpointing.
#[derive(Clone)]
pub struct Paginator {
    store: Option<Arc<dyn CheckpointStore>>,
    limit: PageLimit,
    delay: Duration,
    query: Option<String>,
}

impl fmt::Debug for Paginator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("store", &self.store.as_ref().map(|s| s.location()))
            .field("limit", &self.limit)
            .field("delay", &self.delay)
            .field("query", &self.query)
            .finish()
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}

impl Paginator {
    /// Creates a paginator without a checkpoint store.
    pub fn new() -> Self {
        Self {
            store: None,
            limit: PageLimit::default(),
            delay: DEFAULT_PAGE_DELAY,
            query: None,
        }
    }

    /// Persists progress to `store`.
    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the per-run page cap.
    pub fn with_limit(mut self, limit: PageLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the delay between pages.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Tags the checkpoint with a query; a checkpoint for another query is ignored.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    fn location(&self) -> Option<String> {
        self.store.as_ref().map(|s| s.location())
    }

    async fn load_checkpoint(&self) -> CursorCheckpoint {
        let fresh = CursorCheckpoint::new(self.query.clone());
        let Some(store) = &self.store else {
            return fresh;
        };

        match store.load().await {
            Ok(Some(checkpoint)) if !checkpoint.matches_query(self.query.as_deref()) => {
                warn!(
                    location = %store.location(),
                    saved = ?checkpoint.query,
                    current = ?self.query,
                    "Checkpoint belongs to another query, starting fresh"
                );
                fresh
            }
            Ok(Some(checkpoint)) if checkpoint.cursor.is_some() => {
                info!(
                    location = %store.location(),
                    pages_fetched = checkpoint.pages_fetched,
                    total_items = checkpoint.total_items,
                    "Resuming from checkpoint"
                );
                checkpoint
            }
            Ok(_) => fresh,
            Err(e) => {
                let error = FetchError::checkpoint_io(&store.location(), &e);
                warn!(error = %error, "Checkpoint unreadable, starting fresh");
                fresh
            }
        }
    }

    async fn save_checkpoint(&self, checkpoint: &CursorCheckpoint) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(checkpoint).await {
                let error = FetchError::checkpoint_io(&store.location(), &e);
                warn!(error = %error, "Failed to write checkpoint");
            }
        }
    }

    async fn clear_checkpoint(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear().await {
                let error = FetchError::checkpoint_io(&store.location(), &e);
                warn!(error = %error, "Failed to remove checkpoint");
            }
        }
    }

    /// Fetches pages until the collection is exhausted or the cap is hit.
    ///
    /// `fetch_page` receives the cursor of the page to fetch, `None` for the
    /// first page. On error the checkpoint is written before returning.
    pub async fn run<T, F, Fut>(
        &self,
        mut fetch_page: F,
    ) -> Result<PaginationOutcome<T>, PaginationFailure<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<PageResult<T>, FetchError>>,
    {
        let mut checkpoint = self.load_checkpoint().await;
        let resumed = checkpoint.cursor.is_some();
        let mut cursor = checkpoint.cursor.clone();
        let mut items: Vec<T> = Vec::new();
        let mut pages: u32 = 0;

        loop {
            if pages > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            debug!(
                page = checkpoint.pages_fetched + 1,
                cursor = cursor.as_deref().unwrap_or("<start>"),
                "Fetching page"
            );

            let page = match fetch_page(cursor.clone()).await {
                Ok(page) => page,
                Err(error) => {
                    if checkpoint.pages_fetched > 0 {
                        self.save_checkpoint(&checkpoint).await;
                    }
                    warn!(error = %error, pages, "Pagination stopped on error");
                    let resume_from = if checkpoint.pages_fetched > 0 {
                        self.location()
                    } else {
                        None
                    };
                    return Err(PaginationFailure {
                        error,
                        items,
                        pages,
                        resume_from,
                    });
                }
            };

            let (page_items, next_cursor, has_more) = page.into_parts();
            let count = page_items.len();
            checkpoint.advance(next_cursor.clone(), count);
            items.extend(page_items);
            pages += 1;
            self.save_checkpoint(&checkpoint).await;

            debug!(
                items = count,
                total_items = checkpoint.total_items,
                has_more,
                "Page fetched"
            );

            if !has_more {
                self.clear_checkpoint().await;
                info!(pages, items = items.len(), "Collection exhausted");
                return Ok(PaginationOutcome {
                    items,
                    pages,
                    total_pages: checkpoint.pages_fetched,
                    resumed,
                    stop: StopReason::Exhausted,
                    next_cursor: None,
                    resume_from: None,
                });
            }

            if self.limit.reached(pages) {
                info!(pages, limit = %self.limit, "Page cap reached");
                return Ok(PaginationOutcome {
                    items,
                    pages,
                    total_pages: checkpoint.pages_fetched,
                    resumed,
                    stop: StopReason::Capped,
                    next_cursor,
                    resume_from: self.location(),
                });
            }

            cursor = next_cursor;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
