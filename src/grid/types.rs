//! Series metadata and nested match state
//!
//! The wire shapes mirror the central-data and series-state GraphQL
//! responses. Explicit `null`s are common in live data, so collection and
//! flag fields decode `null` as their default.

use serde::{Deserialize, Deserializer};

// ============================================================================
// GraphQL envelope
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_default")]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

pub(crate) fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Central data: allSeries
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AllSeriesData {
    pub all_series: Option<SeriesConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesConnection {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default, deserialize_with = "null_default")]
    pub edges: Vec<SeriesEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeriesEdge {
    pub node: SeriesNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesNode {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<NamedRef>,
    #[serde(default)]
    pub tournament: Option<NamedRef>,
    #[serde(rename = "type", default)]
    pub series_type: Option<String>,
    #[serde(default)]
    pub start_time_scheduled: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct NamedRef {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Series metadata as listed by the central data API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMeta {
    pub id: String,
    pub title: String,
    pub tournament: String,
    pub tournament_id: String,
    pub series_type: String,
    pub start_time: Option<String>,
}

impl SeriesMeta {
    /// Metadata for a series the user named directly, without listing it
    pub fn manual(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tournament: "Manual Selection".to_string(),
            tournament_id: "N/A".to_string(),
            series_type: "ESPORTS".to_string(),
            start_time: None,
        }
    }
}

impl From<SeriesNode> for SeriesMeta {
    fn from(node: SeriesNode) -> Self {
        let title = node.title.unwrap_or_default();
        let tournament = node.tournament.unwrap_or_default();
        Self {
            id: node.id,
            title: title.name.unwrap_or_else(|| "N/A".to_string()),
            tournament: tournament.name.unwrap_or_else(|| "N/A".to_string()),
            tournament_id: tournament.id.unwrap_or_else(|| "N/A".to_string()),
            series_type: node.series_type.unwrap_or_else(|| "N/A".to_string()),
            start_time: node.start_time_scheduled,
        }
    }
}

/// One page of the listing, already in domain form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesPage {
    pub series: Vec<SeriesMeta>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
    pub total_count: Option<u64>,
}

// ============================================================================
// Central data: team
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TeamData {
    pub team: Option<TeamMeta>,
}

/// Team metadata from the central data API
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMeta {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

// ============================================================================
// Series state
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeriesStateData {
    pub series_state: Option<SeriesState>,
}

/// Nested state of one series: teams, games, players
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesState {
    #[serde(default, deserialize_with = "null_default")]
    pub valid: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub started: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub finished: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub teams: Vec<SeriesTeam>,
    #[serde(default, deserialize_with = "null_default")]
    pub games: Vec<GameState>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesTeam {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub won: bool,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub sequence_number: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub started: bool,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub finished: bool,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub map: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub teams: Vec<GameTeam>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameTeam {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub won: bool,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub kills: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub deaths: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub net_worth: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub money: i64,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
}

// ============================================================================
// Records
// ============================================================================

/// A listed series joined with whatever state could be fetched for it
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    pub meta: SeriesMeta,
    pub state: Option<SeriesState>,
}

impl SeriesRecord {
    pub fn new(meta: SeriesMeta, state: Option<SeriesState>) -> Self {
        Self { meta, state }
    }

    /// State that the service marked valid
    pub fn valid_state(&self) -> Option<&SeriesState> {
        self.state.as_ref().filter(|s| s.valid)
    }

    /// Number of started games; zero when no valid state exists
    pub fn games_played(&self) -> usize {
        self.valid_state().map_or(0, |s| s.games.len())
    }

    /// Whether the state shows at least one played game
    pub fn has_played_games(&self) -> bool {
        self.games_played() > 0
    }

    /// Ids of the teams named in the valid state, series level and per game
    pub fn team_ids(&self) -> impl Iterator<Item = &str> {
        self.valid_state().into_iter().flat_map(|state| {
            let series = state.teams.iter().filter_map(|t| t.id.as_deref());
            let games = state
                .games
                .iter()
                .flat_map(|g| g.teams.iter().filter_map(|t| t.id.as_deref()));
            series.chain(games)
        })
    }
}

// ============================================================================
// Deserialization helpers
// ============================================================================

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Counters are integers on the wire, but floats and nulls show up in live data
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => Ok(n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or_default()),
        other => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

/// Ids arrive as strings, but tolerate numbers
fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn optional_flexible_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
