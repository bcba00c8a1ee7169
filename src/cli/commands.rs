//! CLI commands and argument parsing

use crate::config::{DatabaseSettings, RunConfig};
use crate::types::{DetailLevel, Game, MarketMode, SelectionPolicy};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Esports and market data puller with schema-adaptive database loading
#[derive(Parser, Debug)]
#[command(name = "gridload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull esports series from GRID, write CSVs and optionally load them
    Grid {
        /// Game to pull
        #[arg(long)]
        game: Option<Game>,

        /// Number of series to collect
        #[arg(short = 'n', long)]
        series: Option<usize>,

        /// Selection policy
        #[arg(short, long)]
        mode: Option<SelectionPolicy>,

        /// Series ids to fetch directly (comma-separated), skipping the listing
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,

        /// Tables to produce
        #[arg(long)]
        detail: Option<DetailLevel>,

        /// Maximum series to examine in smart mode
        #[arg(long)]
        max_check: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,

        /// Load the produced tables into the database
        #[arg(long)]
        load: bool,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Pull market statistics, write a CSV and optionally upsert it
    Market {
        /// What to pull
        #[arg(short, long)]
        mode: Option<MarketMode>,

        /// Region key (e.g. forge, domain) for single-region modes
        #[arg(long)]
        region: Option<String>,

        /// Item type ids for specific mode (comma-separated)
        #[arg(long, value_delimiter = ',')]
        type_ids: Vec<u64>,

        #[command(flatten)]
        output: OutputArgs,

        /// Upsert the pulled rows on (region_id, typeid)
        #[arg(long)]
        load: bool,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Load a CSV file into a table, creating or widening it as needed
    Load {
        /// CSV file to read
        csv: PathBuf,

        /// Target table
        table: String,

        /// Drop the table before loading
        #[arg(long)]
        drop: bool,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Upsert a CSV file into a table on its primary key
    Upsert {
        /// CSV file to read
        csv: PathBuf,

        /// Target table
        table: String,

        /// Primary key columns (comma-separated)
        #[arg(long, short = 'k', value_delimiter = ',', required = true)]
        primary_keys: Vec<String>,

        #[command(flatten)]
        database: DatabaseArgs,
    },
}

/// Where extracted CSVs go
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write file names without the run timestamp
    #[arg(long)]
    pub no_timestamp: bool,
}

/// Database target
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// DuckDB database file (in memory when omitted)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Load into PostgreSQL using PGHOST, PGPORT, PGDATABASE, PGUSER and PGPASSWORD
    #[arg(long, conflicts_with = "database")]
    pub postgres: bool,

    /// Schema for created tables
    #[arg(long)]
    pub schema: Option<String>,
}

impl DatabaseArgs {
    /// Flags override the configured database settings
    pub fn resolve(&self, configured: &DatabaseSettings) -> DatabaseSettings {
        let mut settings = configured.clone();
        if self.postgres {
            settings.postgres = true;
            settings.path = None;
        } else if let Some(ref path) = self.database {
            settings.postgres = false;
            settings.path = Some(path.clone());
        }
        if self.schema.is_some() {
            settings.schema.clone_from(&self.schema);
        }
        settings
    }
}

impl Cli {
    /// Apply command line overrides on top of file and default settings
    pub fn apply_overrides(&self, config: &mut RunConfig) {
        match &self.command {
            Commands::Grid {
                game,
                series,
                mode,
                detail,
                max_check,
                output,
                ..
            } => {
                if let Some(game) = game {
                    config.grid.game = *game;
                }
                if let Some(series) = series {
                    config.grid.num_series = *series;
                }
                if let Some(mode) = mode {
                    config.grid.mode = *mode;
                }
                if let Some(detail) = detail {
                    config.grid.detail = *detail;
                }
                if let Some(max_check) = max_check {
                    config.grid.max_series_to_check = *max_check;
                }
                output.apply(config);
            }
            Commands::Market {
                mode,
                region,
                type_ids,
                output,
                ..
            } => {
                if let Some(mode) = mode {
                    config.market.mode = *mode;
                }
                if let Some(region) = region {
                    config.market.region.clone_from(region);
                }
                if !type_ids.is_empty() {
                    config.market.type_ids.clone_from(type_ids);
                }
                output.apply(config);
            }
            Commands::Load { .. } | Commands::Upsert { .. } => {}
        }
    }
}

impl OutputArgs {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(ref dir) = self.output_dir {
            config.output.directory.clone_from(dir);
        }
        if self.no_timestamp {
            config.output.timestamped = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gridload").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_grid_flags_override_config() {
        let cli = parse(&[
            "grid", "--game", "cs2", "-n", "5", "--mode", "recent", "--max-check", "40", "--no-timestamp",
        ]);
        let mut config = RunConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.grid.game, Game::Cs2);
        assert_eq!(config.grid.num_series, 5);
        assert_eq!(config.grid.mode, SelectionPolicy::Recent);
        assert_eq!(config.grid.max_series_to_check, 40);
        assert!(!config.output.timestamped);
        assert_eq!(config.grid.detail, DetailLevel::Full);
    }

    #[test]
    fn test_ids_are_comma_separated() {
        let cli = parse(&["grid", "--ids", "2611111,2622222"]);
        let Commands::Grid { ids, .. } = cli.command else {
            panic!("expected grid command");
        };
        assert_eq!(ids, vec!["2611111", "2622222"]);
    }

    #[test]
    fn test_market_flags() {
        let cli = parse(&["-vv", "market", "--mode", "specific", "--region", "domain", "--type-ids", "34,35"]);
        assert_eq!(cli.verbose, 2);
        let mut config = RunConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.market.mode, MarketMode::Specific);
        assert_eq!(config.market.region, "domain");
        assert_eq!(config.market.type_ids, vec![34, 35]);
    }

    #[test]
    fn test_upsert_requires_keys() {
        assert!(Cli::try_parse_from(["gridload", "upsert", "prices.csv", "prices"]).is_err());
        let cli = parse(&["upsert", "prices.csv", "prices", "-k", "region_id,typeid"]);
        let Commands::Upsert { primary_keys, .. } = cli.command else {
            panic!("expected upsert command");
        };
        assert_eq!(primary_keys, vec!["region_id", "typeid"]);
    }

    #[test]
    fn test_database_args_resolve() {
        let configured = DatabaseSettings {
            path: Some(PathBuf::from("configured.duckdb")),
            postgres: false,
            schema: Some("raw".to_string()),
        };
        let args = DatabaseArgs {
            postgres: true,
            ..DatabaseArgs::default()
        };
        let resolved = args.resolve(&configured);
        assert!(resolved.postgres);
        assert_eq!(resolved.path, None);
        assert_eq!(resolved.schema.as_deref(), Some("raw"));

        assert_eq!(DatabaseArgs::default().resolve(&configured), configured);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["gridload", "-q", "-v", "load", "a.csv", "a"]).is_err());
    }
}
