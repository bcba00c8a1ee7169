//! CLI module
//!
//! Command-line interface for pulls and loads.
//!
//! # Commands
//!
//! - `grid` - Collect esports series, write CSVs, optionally load them
//! - `market` - Pull market statistics, optionally upsert them
//! - `load` - Load a CSV file into a table
//! - `upsert` - Upsert a CSV file on its primary key

mod commands;
mod runner;

pub use commands::{Cli, Commands, DatabaseArgs, OutputArgs};
pub use runner::Runner;
