//! Tests for the pagination walker

use super::*;
use crate::grid::{GameState, SeriesMeta, SeriesPage, SeriesState};
use crate::http::FetchResult;
use crate::retry::RetryPolicy;
use crate::types::SelectionPolicy;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory listing with scripted failures
#[derive(Default)]
struct ScriptedSource {
    pages: Vec<Vec<SeriesMeta>>,
    states: HashMap<String, SeriesState>,
    page_failures: Mutex<VecDeque<FetchResult<SeriesPage>>>,
    state_failures: Mutex<HashMap<String, VecDeque<FetchResult<Option<SeriesState>>>>>,
    page_calls: Mutex<Vec<Option<String>>>,
    state_calls: AtomicUsize,
}

impl ScriptedSource {
    /// `ids` split into pages of `page_len`; ids listed in `played` get a game
    fn new(ids: &[&str], page_len: usize, played: &[&str]) -> Self {
        let pages = ids
            .chunks(page_len)
            .map(|chunk| chunk.iter().map(|id| meta(id, "Pro League")).collect())
            .collect();
        let states = ids
            .iter()
            .map(|id| {
                let games = if played.contains(id) {
                    vec![GameState {
                        id: Some(format!("{id}-g1")),
                        sequence_number: 1,
                        started: true,
                        ..GameState::default()
                    }]
                } else {
                    Vec::new()
                };
                (
                    (*id).to_string(),
                    SeriesState {
                        valid: true,
                        games,
                        ..SeriesState::default()
                    },
                )
            })
            .collect();
        Self {
            pages,
            states,
            ..Self::default()
        }
    }

    fn fail_next_page(&self, result: FetchResult<SeriesPage>) {
        self.page_failures.lock().unwrap().push_back(result);
    }

    fn fail_state(&self, id: &str, result: FetchResult<Option<SeriesState>>) {
        self.state_failures
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(result);
    }
}

fn meta(id: &str, tournament: &str) -> SeriesMeta {
    SeriesMeta {
        id: id.to_string(),
        title: "Dota 2".to_string(),
        tournament: tournament.to_string(),
        tournament_id: "t1".to_string(),
        series_type: "ESPORTS".to_string(),
        start_time: None,
    }
}

#[async_trait]
impl SeriesSource for ScriptedSource {
    async fn fetch_page(&self, after: Option<&str>, _page_size: u32) -> FetchResult<SeriesPage> {
        self.page_calls
            .lock()
            .unwrap()
            .push(after.map(str::to_string));
        if let Some(failure) = self.page_failures.lock().unwrap().pop_front() {
            return failure;
        }
        let index = after.map_or(0, |token| {
            token.trim_start_matches('p').parse::<usize>().unwrap()
        });
        let has_next = index + 1 < self.pages.len();
        FetchResult::Success {
            status: 200,
            body: SeriesPage {
                series: self.pages.get(index).cloned().unwrap_or_default(),
                has_next_page: has_next,
                end_cursor: Some(format!("p{}", index + 1)),
                total_count: None,
            },
        }
    }

    async fn fetch_state(&self, series_id: &str) -> FetchResult<Option<SeriesState>> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(queue) = self.state_failures.lock().unwrap().get_mut(series_id) {
            if let Some(failure) = queue.pop_front() {
                return failure;
            }
        }
        FetchResult::Success {
            status: 200,
            body: self.states.get(series_id).cloned(),
        }
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(1), 3)
}

fn config(policy: SelectionPolicy, target: usize) -> WalkConfig {
    WalkConfig::new(policy, target)
        .with_page_size(2)
        .with_retry(fast_retry())
}

fn ids(outcome: &WalkOutcome) -> Vec<&str> {
    outcome
        .accepted
        .iter()
        .map(|r| r.meta.id.as_str())
        .collect()
}

#[test]
fn test_cursor_advances() {
    let mut cursor = Cursor::start();
    assert_eq!(cursor.token(), None);
    cursor.advance_page(Some("abc".to_string()));
    cursor.advance_item();
    cursor.advance_item();
    assert_eq!(cursor.token(), Some("abc"));
    assert_eq!(cursor.page(), 1);
    assert_eq!(cursor.position(), 2);
}

#[tokio::test]
async fn test_recent_takes_first_three_in_order() {
    let source = ScriptedSource::new(&["s1", "s2", "s3", "s4", "s5"], 2, &[]);
    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 3))
        .run()
        .await;

    assert_eq!(ids(&outcome), vec!["s1", "s2", "s3"]);
    assert_eq!(outcome.stop, WalkStop::TargetReached);
    assert_eq!(outcome.examined, 3);
}

#[tokio::test]
async fn test_recent_stops_when_listing_exhausted() {
    let source = ScriptedSource::new(&["s1", "s2", "s3"], 2, &[]);
    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 10))
        .run()
        .await;

    assert_eq!(ids(&outcome), vec!["s1", "s2", "s3"]);
    assert_eq!(outcome.stop, WalkStop::SourceExhausted);
    assert_eq!(outcome.pages, 2);
}

#[tokio::test]
async fn test_smart_skips_unplayed_within_budget() {
    let source = ScriptedSource::new(&["s1", "s2", "s3", "s4", "s5"], 2, &["s2", "s4"]);
    let outcome = PaginationWalker::new(
        &source,
        config(SelectionPolicy::Smart, 2).with_search_budget(5),
    )
    .run()
    .await;

    assert_eq!(ids(&outcome), vec!["s2", "s4"]);
    assert!(outcome.examined <= 5);
    assert_eq!(outcome.stop, WalkStop::TargetReached);
}

#[tokio::test]
async fn test_smart_never_yields_unplayed_series() {
    let source = ScriptedSource::new(&["a", "b", "c", "d", "e", "f"], 3, &["b", "e"]);
    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Smart, 10))
        .run()
        .await;

    assert!(outcome.accepted.iter().all(|r| r.games_played() > 0));
    assert_eq!(ids(&outcome), vec!["b", "e"]);
}

#[tokio::test]
async fn test_smart_budget_bounds_examination() {
    let source = ScriptedSource::new(&["s1", "s2", "s3", "s4", "s5", "s6"], 2, &["s6"]);
    let outcome = PaginationWalker::new(
        &source,
        config(SelectionPolicy::Smart, 1).with_search_budget(4),
    )
    .run()
    .await;

    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.examined, 4);
    assert_eq!(outcome.stop, WalkStop::BudgetExhausted);
    assert_eq!(source.state_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_excluded_tournaments_skip_state_lookup() {
    let mut source = ScriptedSource::new(&["s1", "s2", "s3"], 3, &[]);
    source.pages[0][1] = meta("s2", "GRID-TEST");

    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 5))
        .run()
        .await;

    assert_eq!(ids(&outcome), vec!["s1", "s3"]);
    assert_eq!(outcome.examined, 3);
    assert_eq!(source.state_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limited_page_retries_at_same_cursor() {
    let source = ScriptedSource::new(&["s1", "s2", "s3", "s4"], 2, &[]);
    // First page succeeds, the second is rate limited once
    let walker_source = &source;
    let mut walker =
        PaginationWalker::new(walker_source, config(SelectionPolicy::Recent, 4));

    let first = walker.next_record().await.unwrap();
    assert_eq!(first.meta.id, "s1");
    source.fail_next_page(FetchResult::RateLimited { retry_after: None });

    let mut rest = Vec::new();
    while let Some(record) = walker.next_record().await {
        rest.push(record.meta.id);
    }

    assert_eq!(rest, vec!["s2", "s3", "s4"]);
    let calls = source.page_calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![None, Some("p1".to_string()), Some("p1".to_string())]
    );
}

#[tokio::test]
async fn test_rate_limited_state_is_not_duplicated() {
    let source = ScriptedSource::new(&["s1", "s2"], 2, &["s1", "s2"]);
    source.fail_state("s1", FetchResult::RateLimited { retry_after: None });
    source.fail_state("s1", FetchResult::transient("timeout"));

    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Smart, 5))
        .run()
        .await;

    assert_eq!(ids(&outcome), vec!["s1", "s2"]);
    assert_eq!(source.state_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_fatal_failure_keeps_partial_results() {
    let source = ScriptedSource::new(&["s1", "s2", "s3"], 3, &[]);
    source.fail_state("s3", FetchResult::fatal("HTTP 401: invalid key"));

    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 3))
        .run()
        .await;

    assert_eq!(ids(&outcome), vec!["s1", "s2"]);
    assert!(outcome.stop.is_aborted());
    assert!(!outcome.is_complete());
}

#[tokio::test]
async fn test_retries_exhausted_aborts_walk() {
    let source = ScriptedSource::new(&["s1"], 1, &[]);
    for _ in 0..3 {
        source.fail_next_page(FetchResult::RateLimited { retry_after: None });
    }

    let outcome = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 1))
        .run()
        .await;

    assert!(outcome.accepted.is_empty());
    match outcome.stop {
        WalkStop::Aborted { page, cause } => {
            assert_eq!(page, 1);
            assert!(cause.contains("3 attempts"));
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[tokio::test]
async fn test_walker_is_not_restartable() {
    let source = ScriptedSource::new(&["s1"], 1, &[]);
    let mut walker = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 1));

    assert!(walker.next_record().await.is_some());
    assert!(walker.next_record().await.is_none());
    assert!(walker.next_record().await.is_none());
    assert_eq!(walker.stop_reason(), Some(&WalkStop::TargetReached));
}

#[tokio::test]
async fn test_cancel_flag_stops_walk() {
    let source = ScriptedSource::new(&["s1", "s2", "s3"], 3, &[]);
    let flag = Arc::new(AtomicBool::new(false));
    let mut walker = PaginationWalker::new(&source, config(SelectionPolicy::Recent, 3))
        .with_cancel_flag(Arc::clone(&flag));

    assert!(walker.next_record().await.is_some());
    flag.store(true, Ordering::SeqCst);
    assert!(walker.next_record().await.is_none());
    assert_eq!(walker.stop_reason(), Some(&WalkStop::Cancelled));
}

#[tokio::test]
async fn test_fetch_listed_keeps_every_id() {
    let source = ScriptedSource::new(&["s1", "s2"], 2, &["s1"]);
    let listed = vec!["s1".to_string(), "s2".to_string(), "missing".to_string()];

    let outcome = fetch_listed(
        &source,
        &listed,
        "Dota 2",
        &config(SelectionPolicy::Recent, 3),
        None,
    )
    .await;

    assert_eq!(ids(&outcome), vec!["s1", "s2", "missing"]);
    assert_eq!(outcome.accepted[0].meta.tournament, "Manual Selection");
    assert!(outcome.accepted[2].state.is_none());
    assert_eq!(outcome.stop, WalkStop::SourceExhausted);
}
