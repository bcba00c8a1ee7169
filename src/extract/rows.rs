//! Flat row types produced from nested series state

use crate::error::Result;
use crate::schema::RawTable;

/// A flat record with a fixed column order
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    /// Cells in `COLUMNS` order
    fn cells(&self) -> Vec<String>;
}

/// Build a raw table from typed rows
pub fn to_table<R: TableRow>(rows: &[R]) -> Result<RawTable> {
    let headers = R::COLUMNS.iter().map(|c| (*c).to_string()).collect();
    RawTable::with_rows(headers, rows.iter().map(TableRow::cells).collect())
}

pub(crate) const NOT_AVAILABLE: &str = "N/A";

pub(crate) fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

/// One row per series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub series_id: String,
    pub game_title: String,
    pub tournament: String,
    pub tournament_id: String,
    pub series_type: String,
    pub start_time: String,
    pub team_1_name: String,
    pub team_1_id: String,
    pub team_1_score: i64,
    pub team_2_name: String,
    pub team_2_id: String,
    pub team_2_score: i64,
    pub series_started: String,
    pub series_finished: String,
    pub series_format: String,
    pub team_1_won: String,
    pub team_2_won: String,
    pub winner: String,
    pub games_played: usize,
}

impl TableRow for SeriesRow {
    const COLUMNS: &'static [&'static str] = &[
        "series_id",
        "game_title",
        "tournament",
        "tournament_id",
        "series_type",
        "start_time",
        "team_1_name",
        "team_1_id",
        "team_1_score",
        "team_2_name",
        "team_2_id",
        "team_2_score",
        "series_started",
        "series_finished",
        "series_format",
        "team_1_won",
        "team_2_won",
        "winner",
        "games_played",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.series_id.clone(),
            self.game_title.clone(),
            self.tournament.clone(),
            self.tournament_id.clone(),
            self.series_type.clone(),
            self.start_time.clone(),
            self.team_1_name.clone(),
            self.team_1_id.clone(),
            self.team_1_score.to_string(),
            self.team_2_name.clone(),
            self.team_2_id.clone(),
            self.team_2_score.to_string(),
            self.series_started.clone(),
            self.series_finished.clone(),
            self.series_format.clone(),
            self.team_1_won.clone(),
            self.team_2_won.clone(),
            self.winner.clone(),
            self.games_played.to_string(),
        ]
    }
}

/// Per-team view of one game
#[derive(Debug, Clone, PartialEq)]
pub struct GameSide {
    pub name: String,
    pub id: String,
    pub side: String,
    pub score: i64,
    pub won: bool,
}

impl Default for GameSide {
    fn default() -> Self {
        Self {
            name: NOT_AVAILABLE.to_string(),
            id: NOT_AVAILABLE.to_string(),
            side: NOT_AVAILABLE.to_string(),
            score: 0,
            won: false,
        }
    }
}

/// One row per played game
#[derive(Debug, Clone, PartialEq)]
pub struct GameRow {
    pub series_id: String,
    pub game_id: String,
    pub game_number: i64,
    pub game_started: bool,
    pub game_started_at: String,
    pub game_finished: bool,
    pub game_finished_at: String,
    pub map_id: String,
    pub map_name: String,
    pub team_1: GameSide,
    pub team_2: GameSide,
    pub tournament: String,
    pub game_title: String,
}

impl TableRow for GameRow {
    const COLUMNS: &'static [&'static str] = &[
        "series_id",
        "game_id",
        "game_number",
        "game_started",
        "game_started_at",
        "game_finished",
        "game_finished_at",
        "map_id",
        "map_name",
        "team_1_name",
        "team_1_id",
        "team_1_side",
        "team_1_score",
        "team_1_won",
        "team_2_name",
        "team_2_id",
        "team_2_side",
        "team_2_score",
        "team_2_won",
        "tournament",
        "game_title",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.series_id.clone(),
            self.game_id.clone(),
            self.game_number.to_string(),
            yes_no(self.game_started),
            self.game_started_at.clone(),
            yes_no(self.game_finished),
            self.game_finished_at.clone(),
            self.map_id.clone(),
            self.map_name.clone(),
            self.team_1.name.clone(),
            self.team_1.id.clone(),
            self.team_1.side.clone(),
            self.team_1.score.to_string(),
            self.team_1.won.to_string(),
            self.team_2.name.clone(),
            self.team_2.id.clone(),
            self.team_2.side.clone(),
            self.team_2.score.to_string(),
            self.team_2.won.to_string(),
            self.tournament.clone(),
            self.game_title.clone(),
        ]
    }
}

/// One row per player per game
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatRow {
    pub series_id: String,
    pub game_id: String,
    pub game_number: i64,
    pub team_name: String,
    pub team_id: String,
    pub player_id: String,
    pub player_name: String,
    pub kills: i64,
    pub deaths: i64,
    pub net_worth: i64,
    pub money: i64,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub tournament: String,
    pub game_title: String,
}

impl TableRow for PlayerStatRow {
    const COLUMNS: &'static [&'static str] = &[
        "series_id",
        "game_id",
        "game_number",
        "team_name",
        "team_id",
        "player_id",
        "player_name",
        "kills",
        "deaths",
        "net_worth",
        "money",
        "position_x",
        "position_y",
        "tournament",
        "game_title",
    ];

    fn cells(&self) -> Vec<String> {
        let coordinate = |v: Option<f64>| v.map(|f| f.to_string()).unwrap_or_default();
        vec![
            self.series_id.clone(),
            self.game_id.clone(),
            self.game_number.to_string(),
            self.team_name.clone(),
            self.team_id.clone(),
            self.player_id.clone(),
            self.player_name.clone(),
            self.kills.to_string(),
            self.deaths.to_string(),
            self.net_worth.to_string(),
            self.money.to_string(),
            coordinate(self.position_x),
            coordinate(self.position_y),
            self.tournament.clone(),
            self.game_title.clone(),
        ]
    }
}

/// Per-team totals across the extracted games
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSummaryRow {
    pub team_id: String,
    pub team_name: String,
    pub game_title: String,
    pub team_logo_url: String,
    pub series_count: usize,
    pub games_played: usize,
    pub games_won: usize,
    pub games_lost: usize,
}

impl TableRow for TeamSummaryRow {
    const COLUMNS: &'static [&'static str] = &[
        "team_id",
        "team_name",
        "game_title",
        "team_logo_url",
        "series_count",
        "games_played",
        "games_won",
        "games_lost",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.team_id.clone(),
            self.team_name.clone(),
            self.game_title.clone(),
            self.team_logo_url.clone(),
            self.series_count.to_string(),
            self.games_played.to_string(),
            self.games_won.to_string(),
            self.games_lost.to_string(),
        ]
    }
}

/// Per-player totals and averages across the extracted games
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummaryRow {
    pub player_id: String,
    pub player_name: String,
    pub team_name: String,
    pub game_title: String,
    pub games_played: usize,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_net_worth: i64,
    pub total_money: i64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_net_worth: f64,
    pub avg_money: f64,
    pub kd_ratio: f64,
}

impl TableRow for PlayerSummaryRow {
    const COLUMNS: &'static [&'static str] = &[
        "player_id",
        "player_name",
        "team_name",
        "game_title",
        "games_played",
        "total_kills",
        "total_deaths",
        "total_net_worth",
        "total_money",
        "avg_kills",
        "avg_deaths",
        "avg_net_worth",
        "avg_money",
        "kd_ratio",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.player_id.clone(),
            self.player_name.clone(),
            self.team_name.clone(),
            self.game_title.clone(),
            self.games_played.to_string(),
            self.total_kills.to_string(),
            self.total_deaths.to_string(),
            self.total_net_worth.to_string(),
            self.total_money.to_string(),
            self.avg_kills.to_string(),
            self.avg_deaths.to_string(),
            self.avg_net_worth.to_string(),
            self.avg_money.to_string(),
            self.kd_ratio.to_string(),
        ]
    }
}
