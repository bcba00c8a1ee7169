//! Flatten series records into series, game and player rows

use super::rows::{yes_no, GameRow, GameSide, PlayerStatRow, SeriesRow, NOT_AVAILABLE};
use crate::grid::{GameState, GameTeam, SeriesRecord, SeriesTeam};
use chrono::{DateTime, NaiveDateTime};

/// Output timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows derived from one series record
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedSeries {
    pub series: SeriesRow,
    pub games: Vec<GameRow>,
    pub players: Vec<PlayerStatRow>,
}

/// Normalise an RFC 3339 timestamp to UTC `YYYY-MM-DD HH:MM:SS`.
///
/// Values already in that form pass through; anything else, and absent
/// values, become `N/A`.
pub fn normalize_timestamp(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.naive_utc().format(TIMESTAMP_FORMAT).to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return parsed.format(TIMESTAMP_FORMAT).to_string();
    }
    NOT_AVAILABLE.to_string()
}

fn or_na(value: Option<&String>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), Clone::clone)
}

/// The series winner: the one team flagged as having won a finished series.
///
/// Scores are not consulted, so a finished series where neither (or both)
/// teams carry the flag has no winner.
fn winner(finished: bool, teams: &[SeriesTeam]) -> String {
    if !finished {
        return NOT_AVAILABLE.to_string();
    }
    let mut winners = teams.iter().take(2).filter(|t| t.won);
    match (winners.next(), winners.next()) {
        (Some(team), None) => or_na(team.name.as_ref()),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Flatten one record.
///
/// A record without a valid state yields a summary row with `N/A` state
/// fields and zero games, and no game or player rows.
pub fn flatten(record: &SeriesRecord) -> FlattenedSeries {
    let meta = &record.meta;
    let mut series = SeriesRow {
        series_id: meta.id.clone(),
        game_title: meta.title.clone(),
        tournament: meta.tournament.clone(),
        tournament_id: meta.tournament_id.clone(),
        series_type: meta.series_type.clone(),
        start_time: normalize_timestamp(meta.start_time.as_deref()),
        team_1_name: NOT_AVAILABLE.to_string(),
        team_1_id: NOT_AVAILABLE.to_string(),
        team_1_score: 0,
        team_2_name: NOT_AVAILABLE.to_string(),
        team_2_id: NOT_AVAILABLE.to_string(),
        team_2_score: 0,
        series_started: NOT_AVAILABLE.to_string(),
        series_finished: NOT_AVAILABLE.to_string(),
        series_format: NOT_AVAILABLE.to_string(),
        team_1_won: NOT_AVAILABLE.to_string(),
        team_2_won: NOT_AVAILABLE.to_string(),
        winner: NOT_AVAILABLE.to_string(),
        games_played: 0,
    };

    let Some(state) = record.valid_state() else {
        return FlattenedSeries {
            series,
            games: Vec::new(),
            players: Vec::new(),
        };
    };

    if let Some(team) = state.teams.first() {
        series.team_1_name = or_na(team.name.as_ref());
        series.team_1_id = or_na(team.id.as_ref());
        series.team_1_score = team.score;
        series.team_1_won = team.won.to_string();
    }
    if let Some(team) = state.teams.get(1) {
        series.team_2_name = or_na(team.name.as_ref());
        series.team_2_id = or_na(team.id.as_ref());
        series.team_2_score = team.score;
        series.team_2_won = team.won.to_string();
    }
    series.series_started = yes_no(state.started);
    series.series_finished = yes_no(state.finished);
    series.series_format = or_na(state.format.as_ref());
    series.winner = winner(state.finished, &state.teams);
    series.games_played = record.games_played();

    let mut games = Vec::with_capacity(state.games.len());
    let mut players = Vec::new();
    for game in &state.games {
        games.push(game_row(record, game));
        players.extend(player_rows(record, game));
    }

    FlattenedSeries {
        series,
        games,
        players,
    }
}

fn game_side(team: Option<&GameTeam>) -> GameSide {
    team.map_or_else(GameSide::default, |t| GameSide {
        name: or_na(t.name.as_ref()),
        id: or_na(t.id.as_ref()),
        side: or_na(t.side.as_ref()),
        score: t.score,
        won: t.won,
    })
}

fn game_row(record: &SeriesRecord, game: &GameState) -> GameRow {
    let map = game.map.as_ref();
    GameRow {
        series_id: record.meta.id.clone(),
        game_id: or_na(game.id.as_ref()),
        game_number: game.sequence_number,
        game_started: game.started,
        game_started_at: normalize_timestamp(game.started_at.as_deref()),
        game_finished: game.finished,
        game_finished_at: normalize_timestamp(game.finished_at.as_deref()),
        map_id: or_na(map.and_then(|m| m.id.as_ref())),
        map_name: or_na(map.and_then(|m| m.name.as_ref())),
        team_1: game_side(game.teams.first()),
        team_2: game_side(game.teams.get(1)),
        tournament: record.meta.tournament.clone(),
        game_title: record.meta.title.clone(),
    }
}

fn player_rows<'a>(
    record: &'a SeriesRecord,
    game: &'a GameState,
) -> impl Iterator<Item = PlayerStatRow> + 'a {
    game.teams.iter().flat_map(move |team| {
        team.players.iter().map(move |player| PlayerStatRow {
            series_id: record.meta.id.clone(),
            game_id: or_na(game.id.as_ref()),
            game_number: game.sequence_number,
            team_name: or_na(team.name.as_ref()),
            team_id: or_na(team.id.as_ref()),
            player_id: or_na(player.id.as_ref()),
            player_name: or_na(player.name.as_ref()),
            kills: player.kills,
            deaths: player.deaths,
            net_worth: player.net_worth,
            money: player.money,
            position_x: player.position.map(|p| p.x),
            position_y: player.position.map(|p| p.y),
            tournament: record.meta.tournament.clone(),
            game_title: record.meta.title.clone(),
        })
    })
}
