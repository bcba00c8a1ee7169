//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: GRID GraphQL → walker → flattened tables →
//! CSV files → DuckDB loads.

use gridload::database::{DuckDbSink, TableRef};
use gridload::extract::{extract_tables, TeamLogos};
use gridload::grid::{GridClient, GridEndpoints};
use gridload::http::{HttpClient, HttpClientConfig};
use gridload::load::{BulkLoader, UpsertSpec};
use gridload::output::{read_csv, write_tables};
use gridload::pagination::{fetch_listed, PaginationWalker, WalkConfig, WalkStop};
use gridload::retry::RetryPolicy;
use gridload::schema::{infer_schema, ColumnType, RawTable};
use gridload::types::{DetailLevel, SelectionPolicy};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Mock GRID collection
// ============================================================================

/// s2 and s4 have played games; the rest have no state yet
const COMPLETE: [&str; 2] = ["s2", "s4"];
const SERIES: [&str; 5] = ["s1", "s2", "s3", "s4", "s5"];

fn listing(ids: &[&str], has_next_page: bool) -> Value {
    let edges: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({"cursor": id, "node": {
                "id": id,
                "title": {"name": "Dota 2"},
                "tournament": {"id": "825", "name": "DreamLeague Season 23"},
                "type": "ESPORTS",
                "startTimeScheduled": "2024-05-01T12:00:00Z"
            }})
        })
        .collect();
    json!({"data": {"allSeries": {
        "totalCount": ids.len(),
        "pageInfo": {"hasNextPage": has_next_page, "endCursor": ids.last()},
        "edges": edges
    }}})
}

fn played_state() -> Value {
    json!({"data": {"seriesState": {
        "valid": true,
        "updatedAt": "2024-05-01T14:00:00Z",
        "format": "best-of-1",
        "started": true,
        "finished": true,
        "teams": [
            {"id": "1", "name": "Alpha", "won": true, "score": 1},
            {"id": "2", "name": "Beta", "won": false, "score": 0}
        ],
        "games": [{
            "id": "g1",
            "sequenceNumber": 1,
            "started": true,
            "startedAt": "2024-05-01T12:05:00Z",
            "finished": true,
            "finishedAt": "2024-05-01T12:45:00Z",
            "map": {"id": "m1", "name": "Dota Map"},
            "teams": [
                {"id": "1", "name": "Alpha", "side": "radiant", "won": true, "score": 30,
                 "players": [{"id": "p1", "name": "Ace", "kills": 10, "deaths": 2,
                              "netWorth": 25000, "money": 1200, "position": {"x": 1.5, "y": 2.0}}]},
                {"id": "2", "name": "Beta", "side": "dire", "won": false, "score": 12,
                 "players": [{"id": "p2", "name": "Bolt", "kills": 4, "deaths": 9,
                              "netWorth": 14000, "money": 300, "position": null}]}
            ]
        }]
    }}})
}

async fn mock_collection() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/central"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&SERIES, false)))
        .mount(&server)
        .await;

    for id in COMPLETE {
        Mock::given(method("POST"))
            .and(path("/state"))
            .and(body_partial_json(json!({"variables": {"id": id}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(played_state()))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"seriesState": null}})))
        .mount(&server)
        .await;

    server
}

fn grid_client(server: &MockServer) -> GridClient {
    let http = HttpClient::with_config(HttpClientConfig::builder().no_pacing().build()).unwrap();
    let endpoints = GridEndpoints {
        central_data: format!("{}/central", server.uri()),
        series_state: format!("{}/state", server.uri()),
    };
    GridClient::new(http, "test-key", endpoints, 2)
}

fn walk(policy: SelectionPolicy, target: usize) -> WalkConfig {
    WalkConfig::new(policy, target).with_retry(RetryPolicy::new(Duration::from_millis(5), 2))
}

fn ids(records: &[gridload::grid::SeriesRecord]) -> Vec<&str> {
    records.iter().map(|r| r.meta.id.as_str()).collect()
}

// ============================================================================
// Walker Scenarios
// ============================================================================

#[tokio::test]
async fn test_recent_mode_keeps_listing_order() {
    let server = mock_collection().await;
    let client = grid_client(&server);

    let outcome = PaginationWalker::new(&client, walk(SelectionPolicy::Recent, 3))
        .run()
        .await;

    assert_eq!(ids(&outcome.accepted), vec!["s1", "s2", "s3"]);
    assert_eq!(outcome.stop, WalkStop::TargetReached);
    assert!(outcome.accepted.iter().any(|r| r.games_played() == 0));
}

#[tokio::test]
async fn test_smart_mode_only_accepts_played_series() {
    let server = mock_collection().await;
    let client = grid_client(&server);

    let outcome = PaginationWalker::new(
        &client,
        walk(SelectionPolicy::Smart, 2).with_search_budget(5),
    )
    .run()
    .await;

    assert_eq!(ids(&outcome.accepted), vec!["s2", "s4"]);
    assert!(outcome.examined <= 5);
    assert!(outcome.accepted.iter().all(|r| r.games_played() > 0));
}

#[tokio::test]
async fn test_smart_mode_respects_search_budget() {
    let server = mock_collection().await;
    let client = grid_client(&server);

    let outcome = PaginationWalker::new(
        &client,
        walk(SelectionPolicy::Smart, 2).with_search_budget(3),
    )
    .run()
    .await;

    assert_eq!(ids(&outcome.accepted), vec!["s2"]);
    assert_eq!(outcome.examined, 3);
    assert_eq!(outcome.stop, WalkStop::BudgetExhausted);
}

#[tokio::test]
async fn test_rate_limited_listing_is_retried_without_loss() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/central"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/central"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["s1", "s2"], false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(played_state()))
        .mount(&server)
        .await;

    let client = grid_client(&server);
    let outcome = PaginationWalker::new(&client, walk(SelectionPolicy::Recent, 5))
        .run()
        .await;

    assert_eq!(ids(&outcome.accepted), vec!["s1", "s2"]);
    assert_eq!(outcome.stop, WalkStop::SourceExhausted);
}

#[tokio::test]
async fn test_listing_failure_keeps_accepted_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/central"))
        .and(body_partial_json(json!({"variables": {"after": null}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["s1", "s2"], true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/central"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(played_state()))
        .mount(&server)
        .await;

    let client = grid_client(&server);
    let outcome = PaginationWalker::new(&client, walk(SelectionPolicy::Recent, 5))
        .run()
        .await;

    assert_eq!(ids(&outcome.accepted), vec!["s1", "s2"]);
    assert!(outcome.stop.is_aborted());
}

#[tokio::test]
async fn test_listed_ids_bypass_the_listing() {
    let server = mock_collection().await;
    let client = grid_client(&server);
    let ids_in = vec!["s4".to_string(), "s5".to_string()];

    let outcome = fetch_listed(&client, &ids_in, "Dota 2", &walk(SelectionPolicy::Smart, 2), None).await;

    assert_eq!(ids(&outcome.accepted), vec!["s4", "s5"]);
    assert_eq!(outcome.accepted[0].meta.tournament, "Manual Selection");
    let listing_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/central")
        .count();
    assert_eq!(listing_calls, 0);
}

// ============================================================================
// End-to-End: walk → extract → CSV → load
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_walk_extract_write_and_load() {
    let server = mock_collection().await;
    let client = grid_client(&server);
    let outcome = PaginationWalker::new(
        &client,
        walk(SelectionPolicy::Smart, 2).with_search_budget(5),
    )
    .run()
    .await;

    let tables = extract_tables(&outcome.accepted, DetailLevel::Full, &TeamLogos::new()).unwrap();
    let suffixes: Vec<_> = tables.iter().map(|t| t.suffix).collect();
    assert_eq!(suffixes, vec!["", "_games", "_players", "_teams", "_player_summary"]);

    let dir = tempfile::tempdir().unwrap();
    let written = write_tables(dir.path(), "dota2_series_summary", &tables, None).unwrap();
    assert_eq!(written.len(), 5);

    let series = read_csv(&written[0].path).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.headers().len(), 19);

    let mut sink = DuckDbSink::in_memory().unwrap();
    let spec = UpsertSpec::new(TableRef::new("dota2_series_summary"), ["series_id"]);
    let first = BulkLoader::new(&mut sink).upsert(&series, &spec).unwrap();
    assert_eq!((first.inserted, first.updated), (2, 0));

    // Loading the same pull again changes nothing
    let second = BulkLoader::new(&mut sink).upsert(&series, &spec).unwrap();
    assert_eq!((second.inserted, second.updated), (0, 2));

    let winner: String = sink
        .connection()
        .query_row(
            "SELECT winner FROM dota2_series_summary WHERE series_id = 's2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(winner, "Alpha");
}

// ============================================================================
// End-to-End: CSV inference and upsert
// ============================================================================

#[test]
fn test_empty_cells_do_not_veto_numeric_types() {
    let table = RawTable::with_rows(
        vec!["a".to_string(), "b".to_string()],
        vec![
            vec!["1".to_string(), String::new()],
            vec!["2".to_string(), "3.5".to_string()],
        ],
    )
    .unwrap();

    let schema = infer_schema(&table).unwrap();
    assert_eq!(schema.get("a").map(|c| c.column_type), Some(ColumnType::Integer));
    assert_eq!(schema.get("b").map(|c| c.column_type), Some(ColumnType::Float));
    assert_eq!(infer_schema(&table).unwrap(), schema);
}

#[test]
fn test_upsert_from_csv_files_keeps_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    std::fs::write(&first, "region_id,typeid,price\n1,34,4.2\n").unwrap();
    std::fs::write(&second, "region_id,typeid,price\n1,34,4.5\n").unwrap();

    let mut sink = DuckDbSink::in_memory().unwrap();
    let spec = UpsertSpec::new(TableRef::new("prices"), ["region_id", "typeid"]);
    BulkLoader::new(&mut sink)
        .upsert(&read_csv(&first).unwrap(), &spec)
        .unwrap();
    let report = BulkLoader::new(&mut sink)
        .upsert(&read_csv(&second).unwrap(), &spec)
        .unwrap();
    assert_eq!((report.inserted, report.updated), (0, 1));

    let rows: Vec<(i64, i64, f64)> = sink
        .connection()
        .prepare("SELECT region_id, typeid, price FROM prices")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![(1, 34, 4.5)]);
}
