//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::{DatabaseSettings, RunConfig};
use crate::database::{DuckDbSink, PostgresSettings, SinkTarget, TableRef};
use crate::error::{Error, Result, ResultExt};
use crate::extract::{extract_tables, NamedTable, TeamLogos, TIMESTAMP_FORMAT};
use crate::grid::GridClient;
use crate::http::HttpClient;
use crate::load::{BulkLoader, LoadReport, UpsertSpec};
use crate::market::{market_table, MarketClient, MarketRequest};
use crate::output::{read_csv, run_timestamp, write_tables};
use crate::pagination::{fetch_listed, PaginationWalker, WalkStop};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Key columns of the extracted GRID tables. Aggregate tables have none and
/// are replaced on every load.
fn natural_key(suffix: &str) -> Option<&'static [&'static str]> {
    match suffix {
        "" => Some(&["series_id"]),
        "_games" => Some(&["series_id", "game_number"]),
        "_players" => Some(&["series_id", "game_number", "player_id"]),
        _ => None,
    }
}

const MARKET_KEY: [&str; 2] = ["region_id", "typeid"];

/// CLI runner
pub struct Runner {
    cli: Cli,
    config: RunConfig,
    cancel: Arc<AtomicBool>,
}

impl Runner {
    /// Resolve the configuration: defaults, then the YAML file, then flags
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = match cli.config {
            Some(ref path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        cli.apply_overrides(&mut config);
        config.validate()?;

        Ok(Self {
            cli,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Flag set on Ctrl-C; walks and loads check it between steps
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        self.watch_interrupt();

        match &self.cli.command {
            Commands::Grid {
                ids, load, database, ..
            } => {
                let database = database.resolve(&self.config.database);
                self.grid(ids, (*load).then_some(&database)).await
            }
            Commands::Market { load, database, .. } => {
                let database = database.resolve(&self.config.database);
                self.market((*load).then_some(&database)).await
            }
            Commands::Load {
                csv,
                table,
                drop,
                database,
            } => {
                let database = database.resolve(&self.config.database);
                self.load_csv(csv, table, None, *drop, &database)
            }
            Commands::Upsert {
                csv,
                table,
                primary_keys,
                database,
            } => {
                let database = database.resolve(&self.config.database);
                self.load_csv(csv, table, Some(primary_keys), false, &database)
            }
        }
    }

    fn watch_interrupt(&self) {
        let flag = self.cancel_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current step");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    fn timestamp(&self) -> Option<String> {
        self.config.output.timestamped.then(run_timestamp)
    }

    fn http_client(&self) -> Result<HttpClient> {
        HttpClient::with_config(self.config.http.client_config())
    }

    // ========================================================================
    // grid
    // ========================================================================

    async fn grid(&self, ids: &[String], load: Option<&DatabaseSettings>) -> Result<()> {
        let settings = &self.config.grid;
        let api_key = settings.api_key()?;
        let client = GridClient::new(
            self.http_client()?,
            api_key,
            settings.endpoints(),
            settings.game.title_id(),
        );
        let walk = self.config.walk_config();

        let outcome = if ids.is_empty() {
            info!(
                "Collecting {} {} series ({} mode)",
                settings.num_series,
                settings.game.display_name(),
                settings.mode.as_str()
            );
            PaginationWalker::new(&client, walk)
                .with_cancel_flag(self.cancel_flag())
                .run()
                .await
        } else {
            info!("Fetching {} listed series", ids.len());
            fetch_listed(
                &client,
                ids,
                settings.game.display_name(),
                &walk,
                Some(self.cancel.as_ref()),
            )
            .await
        };

        let collected = outcome.accepted.len();
        info!(
            "Collected {} series ({} examined, {} pages)",
            collected, outcome.examined, outcome.pages
        );

        let mut files = 0;
        if collected == 0 {
            warn!("No series collected, nothing to write");
        } else {
            let logos = if settings.detail.includes_players() {
                client
                    .fetch_team_logos(outcome.accepted.iter().flat_map(|r| r.team_ids()))
                    .await
            } else {
                TeamLogos::new()
            };
            let tables = extract_tables(&outcome.accepted, settings.detail, &logos)?;
            let base = format!("{}_series_summary", settings.game.file_prefix());
            let timestamp = self.timestamp();
            files = write_tables(&self.config.output.directory, &base, &tables, timestamp.as_deref())?.len();

            if let Some(database) = load {
                self.load_tables(&base, &tables, database)?;
            }
        }

        match outcome.stop {
            WalkStop::Aborted { page, cause } => Err(Error::fatal(format!(
                "walk aborted at page {page} with {collected} series kept: {cause}"
            ))),
            WalkStop::Cancelled => {
                warn!("Cancelled with {collected} series kept, {files} files written");
                Err(Error::Cancelled)
            }
            stop => {
                info!("Done: {collected} series, {files} files written ({stop:?})");
                Ok(())
            }
        }
    }

    fn load_tables(&self, base: &str, tables: &[NamedTable], database: &DatabaseSettings) -> Result<()> {
        let mut sink = open_sink(database).with_context(|| format!("cannot load {base} tables"))?;
        let mut failed = Vec::new();

        tokio::task::block_in_place(|| {
            for named in tables.iter().filter(|t| !t.table.is_empty()) {
                let target = TableRef::new(&format!("{base}{}", named.suffix)).in_schema(database.schema.as_deref());
                let mut loader = self.loader(&mut sink);
                let result = match natural_key(named.suffix) {
                    Some(keys) => loader.upsert(&named.table, &UpsertSpec::new(target.clone(), keys.iter().copied())),
                    None => loader.load_fresh(&named.table, &target, true),
                };
                match result {
                    Ok(report) => log_report(&report),
                    Err(e) => {
                        error!("{e}");
                        failed.push(target.to_string());
                    }
                }
            }
        });

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Other(format!("load failed for {}", failed.join(", "))))
        }
    }

    fn loader<'s>(&self, sink: &'s mut DuckDbSink) -> BulkLoader<'s, DuckDbSink> {
        BulkLoader::new(sink)
            .with_retry(self.config.retry.clone())
            .with_cancel_flag(self.cancel_flag())
    }

    // ========================================================================
    // market
    // ========================================================================

    async fn market(&self, load: Option<&DatabaseSettings>) -> Result<()> {
        let settings = &self.config.market;
        let client = MarketClient::new(self.http_client()?, settings.base_url.as_str())
            .with_retry(self.config.retry.clone())
            .with_region_delay(Duration::from_secs(settings.region_delay_seconds));
        let request = MarketRequest {
            mode: settings.mode,
            region: settings.region.clone(),
            type_ids: settings.type_ids.clone(),
        };
        let base = request.file_name()?;

        let pull = client.pull(&request).await?;
        let pulled_at = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let tables = [NamedTable {
            suffix: "",
            table: market_table(&pull.items, &pull.type_names, &pulled_at)?,
        }];
        let timestamp = self.timestamp();
        write_tables(&self.config.output.directory, base, &tables, timestamp.as_deref())?;

        if let Some(database) = load {
            let loadable = market_table(pull.loadable(), &pull.type_names, &pulled_at)?;
            let skipped = pull.items.len() - loadable.len();
            if skipped > 0 {
                warn!("Skipping {skipped} items without valid last_data");
            }
            let mut sink = open_sink(database)?;
            let spec = UpsertSpec::new(TableRef::new(base).in_schema(database.schema.as_deref()), MARKET_KEY);
            let report = tokio::task::block_in_place(|| self.loader(&mut sink).upsert(&loadable, &spec))?;
            log_report(&report);
        }

        if !pull.failed_regions.is_empty() {
            warn!("Regions without data: {}", pull.failed_regions.join(", "));
        }
        info!("Done: {} market items", pull.items.len());
        Ok(())
    }

    // ========================================================================
    // load / upsert
    // ========================================================================

    fn load_csv(
        &self,
        csv: &Path,
        table: &str,
        primary_keys: Option<&Vec<String>>,
        drop_existing: bool,
        database: &DatabaseSettings,
    ) -> Result<()> {
        let rows = read_csv(csv)?;
        info!("Read {} rows from {}", rows.len(), csv.display());

        let target = TableRef::new(table).in_schema(database.schema.as_deref());
        let mut sink = open_sink(database)?;
        let mut loader = self.loader(&mut sink);
        let report = tokio::task::block_in_place(|| match primary_keys {
            Some(keys) => loader.upsert(&rows, &UpsertSpec::new(target.clone(), keys)),
            None => loader.load_fresh(&rows, &target, drop_existing),
        })?;

        log_report(&report);
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

fn open_sink(settings: &DatabaseSettings) -> Result<DuckDbSink> {
    if settings.postgres {
        DuckDbSink::postgres(&PostgresSettings::from_env()?)
    } else if let Some(ref path) = settings.path {
        DuckDbSink::open(SinkTarget::File(path.clone()))
    } else {
        warn!("No database configured, loading into an in-memory database discarded on exit");
        DuckDbSink::in_memory()
    }
}

fn log_report(report: &LoadReport) {
    info!(
        "Loaded {}: {} rows applied ({} inserted, {} updated) in {} attempt(s)",
        report.table, report.rows_applied, report.inserted, report.updated, report.attempts
    );
    if !report.columns_added.is_empty() {
        info!("Added columns to {}: {}", report.table, report.columns_added.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn runner(args: &[&str]) -> Result<Runner> {
        let cli = Cli::try_parse_from(std::iter::once("gridload").chain(args.iter().copied()))
            .map_err(|e| Error::config(e.to_string()))?;
        Runner::new(cli)
    }

    #[test]
    fn test_natural_keys() {
        assert_eq!(natural_key(""), Some(&["series_id"][..]));
        assert_eq!(natural_key("_players").map(<[_]>::len), Some(3));
        assert_eq!(natural_key("_teams"), None);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(&path, "grid:\n  num_series: 12\n  mode: recent\n").unwrap();

        let runner = runner(&["--config", path.to_str().unwrap(), "grid", "-n", "3"]).unwrap();
        assert_eq!(runner.config().grid.num_series, 3);
        assert_eq!(runner.config().grid.mode, crate::types::SelectionPolicy::Recent);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        assert!(runner(&["grid", "-n", "0"]).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_command_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("prices.csv");
        let db = dir.path().join("prices.duckdb");
        std::fs::write(&csv, "region_id,typeid,avg_price\n10000002,34,4.2\n10000002,35,9.1\n").unwrap();

        let runner = runner(&[
            "upsert",
            csv.to_str().unwrap(),
            "prices",
            "-k",
            "region_id,typeid",
            "--database",
            db.to_str().unwrap(),
        ])
        .unwrap();
        runner.run().await.unwrap();

        let sink = DuckDbSink::open(SinkTarget::File(db)).unwrap();
        let count: i64 = sink
            .connection()
            .query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_market_load_skips_placeholder_rows() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "34": {"last_data": "2024-05-01", "avg_price_month": 4.21},
                "99999": {"last_data": "Itemid not found"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/type_ids"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"34": "Tritanium"})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("run.yaml");
        let db = dir.path().join("market.duckdb");
        let out = dir.path().join("out");
        std::fs::write(
            &config,
            format!(
                "market:\n  base_url: {}\n  mode: specific\n  region: forge\n  type_ids: [34, 99999]\n",
                server.uri()
            ),
        )
        .unwrap();

        let runner = runner(&[
            "--config",
            config.to_str().unwrap(),
            "market",
            "--output-dir",
            out.to_str().unwrap(),
            "--no-timestamp",
            "--load",
            "--database",
            db.to_str().unwrap(),
        ])
        .unwrap();
        runner.run().await.unwrap();

        // The CSV keeps every item, the table only the ones with data
        let written = read_csv(out.join("eve_market_the_forge.csv")).unwrap();
        assert_eq!(written.len(), 2);

        let sink = DuckDbSink::open(SinkTarget::File(db)).unwrap();
        let typeids: Vec<i64> = {
            let mut stmt = sink
                .connection()
                .prepare("SELECT typeid FROM eve_market_the_forge")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .collect::<std::result::Result<_, _>>()
                .unwrap()
        };
        assert_eq!(typeids, vec![34]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_missing_csv() {
        let runner = runner(&["load", "/no/such/file.csv", "t"]).unwrap();
        assert!(matches!(runner.run().await, Err(Error::FileNotFound { .. })));
    }
}
