//! Record flattening
//!
//! Turns nested series records into flat tables: one series summary row
//! per record, one row per played game, one row per player per game, plus
//! team and player aggregates.

mod flatten;
mod rows;
mod summaries;

pub use flatten::{flatten, normalize_timestamp, FlattenedSeries, TIMESTAMP_FORMAT};
pub use rows::{
    to_table, GameRow, GameSide, PlayerStatRow, PlayerSummaryRow, SeriesRow, TableRow,
    TeamSummaryRow,
};
pub use summaries::{player_summaries, team_summaries, TeamLogos};

use crate::error::Result;
use crate::grid::SeriesRecord;
use crate::schema::RawTable;
use crate::types::DetailLevel;

/// A named output table; the suffix is appended to the base file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTable {
    pub suffix: &'static str,
    pub table: RawTable,
}

/// Flatten `records` into the tables `detail` asks for.
///
/// The series table is always first. Child tables are omitted when the
/// detail level excludes them, and kept (possibly empty) otherwise.
/// `logos` fills the team summary's logo column.
pub fn extract_tables(
    records: &[SeriesRecord],
    detail: DetailLevel,
    logos: &TeamLogos,
) -> Result<Vec<NamedTable>> {
    let mut series = Vec::with_capacity(records.len());
    let mut games = Vec::new();
    let mut players = Vec::new();

    for record in records {
        let flat = flatten(record);
        series.push(flat.series);
        games.extend(flat.games);
        players.extend(flat.players);
    }

    let mut tables = vec![NamedTable {
        suffix: "",
        table: to_table(&series)?,
    }];

    if detail.includes_games() {
        tables.push(NamedTable {
            suffix: "_games",
            table: to_table(&games)?,
        });
    }
    if detail.includes_players() {
        tables.push(NamedTable {
            suffix: "_players",
            table: to_table(&players)?,
        });
        tables.push(NamedTable {
            suffix: "_teams",
            table: to_table(&team_summaries(&series, &games, logos))?,
        });
        tables.push(NamedTable {
            suffix: "_player_summary",
            table: to_table(&player_summaries(&players))?,
        });
    }

    Ok(tables)
}
