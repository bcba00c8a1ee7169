//! Pagination module
//!
//! Walks a cursor-paginated series listing under a selection policy.
//!
//! # Overview
//!
//! - **Recent**: accept the first N listed series, in listing order
//! - **Smart**: accept series whose state shows played games, examining at
//!   most `search_budget` items
//!
//! Rate-limited and transient fetches are retried with backoff at the same
//! cursor. A fatal failure stops the walk but keeps what was accepted.

mod types;
mod walker;

pub use types::{Cursor, SeriesSource, WalkConfig, WalkOutcome, WalkStop};
pub use walker::{fetch_listed, PaginationWalker};

#[cfg(test)]
mod tests;
