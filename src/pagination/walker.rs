//! Lazy walk over a paginated series listing
//!
//! The walker pulls one page at a time, looks up state for each listed
//! series, and yields the ones its selection policy accepts. A page or
//! state lookup that is rate limited is retried at the same cursor, so no
//! item is skipped or yielded twice. A walk is single use: once it has
//! stopped it yields nothing more, and `run` consumes it.

use super::types::{Cursor, SeriesSource, WalkConfig, WalkOutcome, WalkStop};
use crate::grid::{SeriesMeta, SeriesRecord};
use crate::retry::fetch_with_retry;
use crate::types::SelectionPolicy;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Walks a [`SeriesSource`] and yields accepted series records
pub struct PaginationWalker<'a, S: SeriesSource + ?Sized> {
    source: &'a S,
    config: WalkConfig,
    cursor: Cursor,
    buffer: VecDeque<SeriesMeta>,
    has_more_pages: bool,
    accepted: usize,
    stop: Option<WalkStop>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S: SeriesSource + ?Sized> PaginationWalker<'a, S> {
    pub fn new(source: &'a S, config: WalkConfig) -> Self {
        Self {
            source,
            config,
            cursor: Cursor::start(),
            buffer: VecDeque::new(),
            has_more_pages: true,
            accepted: 0,
            stop: None,
            cancel: None,
        }
    }

    /// Stop at the next item boundary once `flag` is set
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Why the walk ended, once it has
    pub fn stop_reason(&self) -> Option<&WalkStop> {
        self.stop.as_ref()
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn finish(&mut self, reason: WalkStop) -> Option<SeriesRecord> {
        debug!(
            "Walk stopped after {} examined, {} accepted: {:?}",
            self.cursor.position(),
            self.accepted,
            reason
        );
        self.stop = Some(reason);
        None
    }

    /// Yield the next accepted record, or `None` once the walk has stopped
    pub async fn next_record(&mut self) -> Option<SeriesRecord> {
        loop {
            if self.stop.is_some() {
                return None;
            }
            if self.cancelled() {
                return self.finish(WalkStop::Cancelled);
            }
            if self.accepted >= self.config.target_count {
                return self.finish(WalkStop::TargetReached);
            }
            if self.config.policy == SelectionPolicy::Smart
                && self.cursor.position() >= self.config.search_budget
            {
                return self.finish(WalkStop::BudgetExhausted);
            }

            let Some(meta) = self.buffer.pop_front() else {
                if !self.has_more_pages {
                    return self.finish(WalkStop::SourceExhausted);
                }
                if let Err(reason) = self.load_page().await {
                    return self.finish(reason);
                }
                continue;
            };

            self.cursor.advance_item();

            if self.config.is_excluded(&meta.tournament) {
                debug!("Skipping series {} from excluded tournament", meta.id);
                continue;
            }

            let label = format!("state of series {}", meta.id);
            let source = self.source;
            let id = meta.id.clone();
            let fetched =
                fetch_with_retry(&self.config.retry, &label, || source.fetch_state(&id)).await;
            let state = match fetched {
                Ok(state) => state,
                Err(e) => {
                    warn!("Giving up on {label}: {e}");
                    return self.finish(WalkStop::Aborted {
                        page: self.cursor.page(),
                        cause: e.to_string(),
                    });
                }
            };

            let record = SeriesRecord::new(meta, state);
            let keep = match self.config.policy {
                SelectionPolicy::Recent => true,
                SelectionPolicy::Smart => record.has_played_games(),
            };
            if !keep {
                debug!("Series {} has no played games", record.meta.id);
                continue;
            }

            self.accepted += 1;
            debug!(
                "Accepted series {} ({}/{})",
                record.meta.id, self.accepted, self.config.target_count
            );
            return Some(record);
        }
    }

    /// Fetch the page at the current cursor, retrying without moving it
    async fn load_page(&mut self) -> Result<(), WalkStop> {
        let label = format!("series page {}", self.cursor.page() + 1);
        let source = self.source;
        let token = self.cursor.token().map(str::to_string);
        let page_size = self.config.page_size;

        let fetched = fetch_with_retry(&self.config.retry, &label, || {
            source.fetch_page(token.as_deref(), page_size)
        })
        .await;
        let page = fetched.map_err(|e| {
            warn!("Giving up on {label}: {e}");
            WalkStop::Aborted {
                page: self.cursor.page() + 1,
                cause: e.to_string(),
            }
        })?;

        debug!(
            "Fetched {label}: {} series, more pages: {}",
            page.series.len(),
            page.has_next_page
        );

        // An empty page or a missing continuation token ends the listing
        self.has_more_pages =
            page.has_next_page && page.end_cursor.is_some() && !page.series.is_empty();
        self.cursor.advance_page(page.end_cursor);
        self.buffer.extend(page.series);
        Ok(())
    }

    /// Drive the walk to completion, keeping everything accepted so far
    pub async fn run(mut self) -> WalkOutcome {
        let mut accepted = Vec::new();
        while let Some(record) = self.next_record().await {
            accepted.push(record);
        }

        let stop = self.stop.unwrap_or(WalkStop::SourceExhausted);
        match &stop {
            WalkStop::Aborted { page, cause } => warn!(
                "Walk aborted on page {page} with {} series kept: {cause}",
                accepted.len()
            ),
            WalkStop::BudgetExhausted => warn!(
                "Examined {} series, found only {} with played games",
                self.cursor.position(),
                accepted.len()
            ),
            _ => info!(
                "Walk finished: {} accepted, {} examined, {} pages",
                accepted.len(),
                self.cursor.position(),
                self.cursor.page()
            ),
        }

        WalkOutcome {
            accepted,
            examined: self.cursor.position(),
            pages: self.cursor.page(),
            stop,
        }
    }
}

/// Fetch state for an explicit list of series ids instead of walking the listing.
///
/// Every id is kept whether or not it has state; a fetch that fails after
/// retries stops the run with the records gathered so far.
pub async fn fetch_listed<S: SeriesSource + ?Sized>(
    source: &S,
    ids: &[String],
    title: &str,
    config: &WalkConfig,
    cancel: Option<&AtomicBool>,
) -> WalkOutcome {
    let mut accepted = Vec::with_capacity(ids.len());
    let mut examined = 0;
    let mut stop = WalkStop::SourceExhausted;

    for id in ids {
        if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            stop = WalkStop::Cancelled;
            break;
        }
        examined += 1;
        let label = format!("state of series {id}");
        match fetch_with_retry(&config.retry, &label, || source.fetch_state(id)).await {
            Ok(state) => {
                if state.is_none() {
                    warn!("No state found for series {id}");
                }
                accepted.push(SeriesRecord::new(SeriesMeta::manual(id, title), state));
            }
            Err(e) => {
                warn!("Giving up on {label}: {e}");
                stop = WalkStop::Aborted {
                    page: 0,
                    cause: e.to_string(),
                };
                break;
            }
        }
    }

    WalkOutcome {
        accepted,
        examined,
        pages: 0,
        stop,
    }
}
