// Search session: query text, debounced search scheduling, and result
// display state. The session owns no timers itself; it tells the caller
// what to do (clear vs. schedule) and the caller drives the latest-wins
// debouncer so at most one search request is outstanding.

use tracing::warn;

use crate::gateway::{GatewayError, SearchResult};
use crate::player::PlayerCard;

pub const FALLBACK_SEARCH: &str = "Search failed";

/// What the caller should do after a query change.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAction {
    /// Empty query: results cleared, cancel pending and in-flight work,
    /// display mode returns to idle.
    Clear,
    /// Schedule a debounced search for the trimmed query.
    Debounce { query: String },
}

#[derive(Debug, Default)]
pub struct SearchSession {
    query: String,
    results: Vec<PlayerCard>,
    loading: bool,
    error: Option<String>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The displayed query text, updated synchronously on every change.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[PlayerCard] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record a query change. The displayed text updates immediately; the
    /// returned action tells the caller whether to cancel or debounce.
    pub fn on_query_change(&mut self, text: &str) -> QueryAction {
        self.query = text.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.results.clear();
            self.error = None;
            self.loading = false;
            QueryAction::Clear
        } else {
            self.loading = true;
            self.error = None;
            QueryAction::Debounce {
                query: trimmed.to_string(),
            }
        }
    }

    /// Apply a search response. Cancelled requests are a no-op: they leave
    /// displayed results untouched and show no error. Returns `false` when
    /// the response was suppressed that way.
    pub fn apply(&mut self, result: Result<Vec<SearchResult>, GatewayError>) -> bool {
        match result {
            Ok(raw) => {
                self.results = raw.into_iter().map(SearchResult::into_card).collect();
                self.loading = false;
                self.error = None;
                true
            }
            Err(e) if e.is_cancelled() => false,
            Err(e) => {
                let msg = e.user_message(FALLBACK_SEARCH);
                warn!("search failed: {msg}");
                self.results.clear();
                self.loading = false;
                self.error = Some(msg);
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
