//! GRID esports data source
//!
//! Typed access to the series listing and series state GraphQL services.

mod client;
pub mod queries;
mod types;

pub use client::{GridClient, GridEndpoints, DEFAULT_CENTRAL_DATA_URL, DEFAULT_SERIES_STATE_URL};
pub use types::{
    GameState, GameTeam, NamedRef, PlayerState, Position, SeriesMeta, SeriesPage, SeriesRecord,
    SeriesState, SeriesTeam, TeamMeta,
};
