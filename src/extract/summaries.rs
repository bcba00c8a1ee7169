//! Team and player aggregates over extracted rows

use super::rows::{
    GameRow, GameSide, PlayerStatRow, PlayerSummaryRow, SeriesRow, TeamSummaryRow, NOT_AVAILABLE,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Team logo URLs by team id
pub type TeamLogos = HashMap<String, String>;

#[derive(Default)]
struct TeamTotals {
    name: String,
    series: BTreeSet<String>,
    played: usize,
    won: usize,
}

/// Per-team counts, keyed by team id and title, sorted by key.
///
/// Teams come from both the series rows and the game rows, so a team whose
/// series have no played games still appears. Series are counted from the
/// series rows, games from the game rows. Teams missing from `logos` get
/// `N/A` as their logo.
pub fn team_summaries(series: &[SeriesRow], games: &[GameRow], logos: &TeamLogos) -> Vec<TeamSummaryRow> {
    let mut totals: BTreeMap<(String, String), TeamTotals> = BTreeMap::new();

    for row in series {
        for (id, name) in [(&row.team_1_id, &row.team_1_name), (&row.team_2_id, &row.team_2_name)] {
            if id == NOT_AVAILABLE {
                continue;
            }
            let entry = totals.entry((id.clone(), row.game_title.clone())).or_default();
            if entry.name.is_empty() {
                entry.name.clone_from(name);
            }
            entry.series.insert(row.series_id.clone());
        }
    }

    let mut record = |side: &GameSide, game: &GameRow| {
        if side.id == NOT_AVAILABLE {
            return;
        }
        let entry = totals
            .entry((side.id.clone(), game.game_title.clone()))
            .or_default();
        entry.name.clone_from(&side.name);
        entry.played += 1;
        if side.won {
            entry.won += 1;
        }
    };

    for game in games {
        record(&game.team_1, game);
        record(&game.team_2, game);
    }

    totals
        .into_iter()
        .map(|((team_id, game_title), t)| TeamSummaryRow {
            team_logo_url: logos
                .get(&team_id)
                .cloned()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            team_id,
            team_name: t.name,
            game_title,
            series_count: t.series.len(),
            games_played: t.played,
            games_won: t.won,
            games_lost: t.played - t.won,
        })
        .collect()
}

#[derive(Default)]
struct PlayerTotals {
    name: String,
    team_name: String,
    games: usize,
    kills: i64,
    deaths: i64,
    net_worth: i64,
    money: i64,
}

/// Per-player totals and two-decimal averages, keyed by player id and title
pub fn player_summaries(players: &[PlayerStatRow]) -> Vec<PlayerSummaryRow> {
    let mut totals: BTreeMap<(String, String), PlayerTotals> = BTreeMap::new();

    for row in players.iter().filter(|p| p.player_id != NOT_AVAILABLE) {
        let entry = totals
            .entry((row.player_id.clone(), row.game_title.clone()))
            .or_default();
        entry.name.clone_from(&row.player_name);
        entry.team_name.clone_from(&row.team_name);
        entry.games += 1;
        entry.kills += row.kills;
        entry.deaths += row.deaths;
        entry.net_worth += row.net_worth;
        entry.money += row.money;
    }

    totals
        .into_iter()
        .map(|((player_id, game_title), t)| {
            let games = t.games.max(1) as f64;
            let kd_ratio = if t.deaths > 0 {
                round2(t.kills as f64 / t.deaths as f64)
            } else {
                t.kills as f64
            };
            PlayerSummaryRow {
                player_id,
                player_name: t.name,
                team_name: t.team_name,
                game_title,
                games_played: t.games,
                total_kills: t.kills,
                total_deaths: t.deaths,
                total_net_worth: t.net_worth,
                total_money: t.money,
                avg_kills: round2(t.kills as f64 / games),
                avg_deaths: round2(t.deaths as f64 / games),
                avg_net_worth: round2(t.net_worth as f64 / games),
                avg_money: round2(t.money as f64 / games),
                kd_ratio,
            }
        })
        .collect()
}
