//! GRID GraphQL source
//!
//! Lists series through the central data API and fetches nested state from
//! the series state API. Both calls authenticate with the `x-api-key` header.

use super::queries::{ALL_SERIES, SERIES_STATE, TEAM};
use super::types::{
    join_errors, AllSeriesData, GraphQlResponse, SeriesMeta, SeriesPage, SeriesState,
    SeriesStateData, TeamData, TeamMeta,
};
use crate::http::{FetchRequest, FetchResult, HttpClient};
use crate::pagination::SeriesSource;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

pub const DEFAULT_CENTRAL_DATA_URL: &str = "https://api-op.grid.gg/central-data/graphql";
pub const DEFAULT_SERIES_STATE_URL: &str =
    "https://api-op.grid.gg/live-data-feed/series-state/graphql";

/// Service endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEndpoints {
    pub central_data: String,
    pub series_state: String,
}

impl Default for GridEndpoints {
    fn default() -> Self {
        Self {
            central_data: DEFAULT_CENTRAL_DATA_URL.to_string(),
            series_state: DEFAULT_SERIES_STATE_URL.to_string(),
        }
    }
}

/// Series source backed by the GRID APIs
pub struct GridClient {
    http: HttpClient,
    api_key: String,
    endpoints: GridEndpoints,
    title_id: u32,
}

impl GridClient {
    pub fn new(
        http: HttpClient,
        api_key: impl Into<String>,
        endpoints: GridEndpoints,
        title_id: u32,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            endpoints,
            title_id,
        }
    }

    pub fn title_id(&self) -> u32 {
        self.title_id
    }

    fn request(&self, url: &str, query: &str, variables: Value) -> FetchRequest {
        FetchRequest::graphql(url, query, variables).header("x-api-key", &self.api_key)
    }

    /// Team metadata from the central data API; `None` for unknown teams
    pub async fn fetch_team(&self, team_id: &str) -> FetchResult<Option<TeamMeta>> {
        let request = self.request(
            &self.endpoints.central_data,
            TEAM,
            json!({ "teamId": team_id }),
        );
        self.http
            .fetch(&request)
            .await
            .and_then(|status, body| decode_team(team_id, status, body))
    }

    /// Logo URLs for `team_ids`, one paced request per team.
    ///
    /// Lookups are best effort: teams whose request fails or that have no
    /// logo are left out of the map.
    pub async fn fetch_team_logos<'a>(
        &self,
        team_ids: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, String> {
        let unique: BTreeSet<&str> = team_ids.into_iter().collect();
        info!("Fetching metadata for {} teams", unique.len());

        let mut logos = HashMap::with_capacity(unique.len());
        for team_id in unique {
            match self.fetch_team(team_id).await {
                FetchResult::Success { body: Some(team), .. } => {
                    if let Some(url) = team.logo_url.filter(|u| !u.trim().is_empty()) {
                        logos.insert(team_id.to_string(), url);
                    }
                }
                FetchResult::Success { body: None, .. } => {}
                FetchResult::RateLimited { .. } => debug!("Team {team_id} lookup rate limited"),
                FetchResult::TransientFailure { cause } | FetchResult::FatalFailure { cause } => {
                    debug!("Team {team_id} lookup failed: {cause}");
                }
            }
        }
        logos
    }
}

impl std::fmt::Debug for GridClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridClient")
            .field("endpoints", &self.endpoints)
            .field("title_id", &self.title_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SeriesSource for GridClient {
    async fn fetch_page(&self, after: Option<&str>, page_size: u32) -> FetchResult<SeriesPage> {
        let variables = json!({
            "first": page_size,
            "after": after,
            "titleId": self.title_id.to_string(),
        });
        let request = self.request(&self.endpoints.central_data, ALL_SERIES, variables);
        self.http.fetch(&request).await.and_then(decode_page)
    }

    async fn fetch_state(&self, series_id: &str) -> FetchResult<Option<SeriesState>> {
        let request = self.request(
            &self.endpoints.series_state,
            SERIES_STATE,
            json!({ "id": series_id }),
        );
        self.http
            .fetch(&request)
            .await
            .and_then(|status, body| decode_state(series_id, status, body))
    }
}

/// Decode an `allSeries` response. GraphQL errors here mean the query or key
/// is wrong, so they are fatal.
pub(crate) fn decode_page(status: u16, body: Value) -> FetchResult<SeriesPage> {
    let response: GraphQlResponse<AllSeriesData> = match serde_json::from_value(body) {
        Ok(response) => response,
        Err(e) => return FetchResult::fatal(format!("unexpected allSeries shape: {e}")),
    };
    if !response.errors.is_empty() {
        return FetchResult::fatal(format!(
            "allSeries returned errors: {}",
            join_errors(&response.errors)
        ));
    }
    let Some(connection) = response.data.and_then(|d| d.all_series) else {
        return FetchResult::fatal("allSeries returned no data");
    };

    FetchResult::Success {
        status,
        body: SeriesPage {
            series: connection
                .edges
                .into_iter()
                .map(|edge| SeriesMeta::from(edge.node))
                .collect(),
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
            total_count: connection.total_count,
        },
    }
}

/// Decode a `seriesState` response. Missing state and per-series GraphQL
/// errors (typically "not found" for unplayed series) are not failures.
pub(crate) fn decode_state(
    series_id: &str,
    status: u16,
    body: Value,
) -> FetchResult<Option<SeriesState>> {
    let response: GraphQlResponse<SeriesStateData> = match serde_json::from_value(body) {
        Ok(response) => response,
        Err(e) => return FetchResult::fatal(format!("unexpected seriesState shape: {e}")),
    };
    if !response.errors.is_empty() {
        debug!(
            "Series {series_id} has no state: {}",
            join_errors(&response.errors)
        );
        return FetchResult::Success { status, body: None };
    }
    FetchResult::Success {
        status,
        body: response.data.and_then(|d| d.series_state),
    }
}

/// Decode a `team` response; GraphQL errors mean the team is unknown
pub(crate) fn decode_team(team_id: &str, status: u16, body: Value) -> FetchResult<Option<TeamMeta>> {
    let response: GraphQlResponse<TeamData> = match serde_json::from_value(body) {
        Ok(response) => response,
        Err(e) => return FetchResult::fatal(format!("unexpected team shape: {e}")),
    };
    if !response.errors.is_empty() {
        debug!("Team {team_id} not found: {}", join_errors(&response.errors));
        return FetchResult::Success { status, body: None };
    }
    FetchResult::Success {
        status,
        body: response.data.and_then(|d| d.team),
    }
}
