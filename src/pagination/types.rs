//! Pagination types and traits
//!
//! Defines the cursor, walk configuration, outcome, and the source trait
//! that the walker drives.

use crate::grid::{SeriesPage, SeriesRecord, SeriesState};
use crate::http::FetchResult;
use crate::retry::RetryPolicy;
use crate::types::SelectionPolicy;
use async_trait::async_trait;

/// A paginated listing of series plus per-series state lookups.
///
/// Implementations perform one attempt per call; the walker owns retries.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch the page that starts after `after` (`None` for the first page)
    async fn fetch_page(&self, after: Option<&str>, page_size: u32) -> FetchResult<SeriesPage>;

    /// Fetch nested state for one series; `Success(None)` when it has none
    async fn fetch_state(&self, series_id: &str) -> FetchResult<Option<SeriesState>>;
}

/// Position of a walk in the remote listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    token: Option<String>,
    position: u64,
    page: u64,
}

impl Cursor {
    /// Cursor before the first page
    pub fn start() -> Self {
        Self::default()
    }

    /// Opaque continuation token for the next page request
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Items examined so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Pages fetched so far
    pub fn page(&self) -> u64 {
        self.page
    }

    pub(crate) fn advance_page(&mut self, next_token: Option<String>) {
        self.page += 1;
        self.token = next_token;
    }

    pub(crate) fn advance_item(&mut self) {
        self.position += 1;
    }
}

/// Configuration for one walk
#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub policy: SelectionPolicy,
    /// Items to accept before stopping
    pub target_count: usize,
    /// Upper bound on items examined under the smart policy
    pub search_budget: u64,
    pub page_size: u32,
    /// Tournament name fragments whose series are skipped without a state lookup
    pub excluded_tournaments: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Smart,
            target_count: 50,
            search_budget: 2000,
            page_size: 50,
            excluded_tournaments: vec!["GRID-TEST".to_string()],
            retry: RetryPolicy::default(),
        }
    }
}

impl WalkConfig {
    pub fn new(policy: SelectionPolicy, target_count: usize) -> Self {
        Self {
            policy,
            target_count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_search_budget(mut self, budget: u64) -> Self {
        self.search_budget = budget;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_excluded_tournaments(mut self, names: Vec<String>) -> Self {
        self.excluded_tournaments = names;
        self
    }

    pub(crate) fn is_excluded(&self, tournament: &str) -> bool {
        self.excluded_tournaments
            .iter()
            .any(|t| !t.is_empty() && tournament.contains(t.as_str()))
    }
}

/// Why a walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStop {
    TargetReached,
    /// Smart policy examined `search_budget` items without filling the target
    BudgetExhausted,
    /// The listing has no more pages
    SourceExhausted,
    /// A fetch failed fatally or ran out of retries
    Aborted { page: u64, cause: String },
    Cancelled,
}

impl WalkStop {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Accepted records and how the walk ended
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub accepted: Vec<SeriesRecord>,
    pub examined: u64,
    pub pages: u64,
    pub stop: WalkStop,
}

impl WalkOutcome {
    /// Ended for a reason other than a failure
    pub fn is_complete(&self) -> bool {
        !matches!(self.stop, WalkStop::Aborted { .. } | WalkStop::Cancelled)
    }
}
