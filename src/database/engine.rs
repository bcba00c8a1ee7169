//! DuckDB-backed sink
//!
//! Writes to an embedded DuckDB database (in memory or a file) or to a
//! PostgreSQL database attached through DuckDB's `postgres` extension.

use super::sink::{Dialect, ExistingColumn, MergeStrategy, Sink, SinkTx, TableRef};
use super::sql;
use crate::error::{Error, Result};
use crate::schema::{CellValue, Column, ColumnSchema};
use crate::types::OptionStringExt;
use duckdb::types::{ToSqlOutput, Value, ValueRef};
use duckdb::{params, params_from_iter, Connection, ToSql, Transaction};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Alias used for an attached PostgreSQL database
const ATTACHED_CATALOG: &str = "target_db";

static PASSWORD_PARAM: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(password\s*=\s*)('[^']*'|\S+)").ok());

/// Where a [`DuckDbSink`] writes
#[derive(Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Memory,
    File(PathBuf),
    /// libpq key/value string or `postgresql://` URL
    Postgres { connection_string: String },
}

impl std::fmt::Debug for SinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Postgres { connection_string } => f
                .debug_struct("Postgres")
                .field("connection_string", &mask_password(connection_string))
                .finish(),
        }
    }
}

/// Connection settings for a PostgreSQL sink
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
}

impl PostgresSettings {
    /// Read `PGHOST`, `PGPORT`, `PGDATABASE`, `PGUSER` and `PGPASSWORD`
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .none_if_empty()
                .ok_or_else(|| Error::missing_field(name))
        };

        let port = match std::env::var("PGPORT") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|_| Error::invalid_value("PGPORT", format!("'{raw}' is not a port")))?,
            _ => 5432,
        };

        Ok(Self {
            host: var("PGHOST")?,
            port,
            database: var("PGDATABASE")?,
            user: var("PGUSER")?,
            password: var("PGPASSWORD")?,
            sslmode: std::env::var("PGSSLMODE").unwrap_or_else(|_| "require".to_string()),
        })
    }

    pub fn connection_string(&self) -> String {
        let quote = |v: &str| format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'"));
        format!(
            "host={} port={} dbname={} user={} password={} sslmode={}",
            quote(&self.host),
            self.port,
            quote(&self.database),
            quote(&self.user),
            quote(&self.password),
            quote(&self.sslmode)
        )
    }
}

impl std::fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .field("sslmode", &self.sslmode)
            .finish()
    }
}

/// Replace the password in a libpq string or URL with `****`
pub fn mask_password(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@') {
        if let Some(scheme_end) = connection_string.find("://") {
            let credentials = &connection_string[scheme_end + 3..at_pos];
            if let Some(colon) = credentials.find(':') {
                let before_pass = &connection_string[..scheme_end + 3 + colon + 1];
                let after_at = &connection_string[at_pos..];
                return format!("{before_pass}****{after_at}");
            }
        }
    }
    match PASSWORD_PARAM.as_ref() {
        Some(re) => re.replace_all(connection_string, "${1}****").into_owned(),
        None => connection_string.to_string(),
    }
}

/// Sink writing through an embedded DuckDB connection
pub struct DuckDbSink {
    conn: Connection,
    target: SinkTarget,
    dialect: Dialect,
}

impl DuckDbSink {
    pub fn open(target: SinkTarget) -> Result<Self> {
        let conn = match target {
            SinkTarget::File(ref path) => Connection::open(path)
                .map_err(|e| Error::config(format!("Failed to open DuckDB file {}: {e}", path.display())))?,
            SinkTarget::Memory | SinkTarget::Postgres { .. } => Connection::open_in_memory()
                .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")))?,
        };

        let dialect = match target {
            SinkTarget::Postgres {
                ref connection_string,
            } => {
                attach_postgres(&conn, connection_string)?;
                Dialect::attached_postgres(ATTACHED_CATALOG)
            }
            _ => Dialect::duckdb(),
        };

        let sink = Self {
            conn,
            target,
            dialect,
        };
        tracing::info!("Opened sink: {}", sink.connection_info());
        Ok(sink)
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(SinkTarget::Memory)
    }

    pub fn postgres(settings: &PostgresSettings) -> Result<Self> {
        Self::open(SinkTarget::Postgres {
            connection_string: settings.connection_string(),
        })
    }

    /// Underlying connection, for ad-hoc reads
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn target(&self) -> &SinkTarget {
        &self.target
    }

    /// Target description with the password masked
    pub fn connection_info(&self) -> String {
        match self.target {
            SinkTarget::Memory => "duckdb (in-memory)".to_string(),
            SinkTarget::File(ref path) => format!("duckdb ({})", path.display()),
            SinkTarget::Postgres {
                ref connection_string,
            } => format!("postgres via duckdb ({})", mask_password(connection_string)),
        }
    }
}

impl std::fmt::Debug for DuckDbSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbSink")
            .field("target", &self.target)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

fn attach_postgres(conn: &Connection, connection_string: &str) -> Result<()> {
    conn.execute_batch("INSTALL postgres; LOAD postgres;")
        .map_err(|e| Error::config(format!("Failed to load postgres extension: {e}")))?;

    let attach_sql = format!(
        "ATTACH '{}' AS {ATTACHED_CATALOG} (TYPE POSTGRES);",
        connection_string.replace('\'', "''")
    );
    conn.execute_batch(&attach_sql).map_err(|e| {
        // The driver error may echo the connection string
        Error::sink_transient(format!(
            "Failed to attach PostgreSQL: {}",
            mask_password(&e.to_string())
        ))
    })
}

impl Sink for DuckDbSink {
    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn begin(&mut self) -> Result<Box<dyn SinkTx + '_>> {
        let tx = self.conn.transaction()?;
        Ok(Box::new(DuckDbTx {
            tx,
            dialect: &self.dialect,
        }))
    }

    fn describe(&self) -> String {
        self.connection_info()
    }
}

struct DuckDbTx<'c> {
    tx: Transaction<'c>,
    dialect: &'c Dialect,
}

impl DuckDbTx<'_> {
    fn insert_rows(&self, statement: &str, rows: &[Vec<CellValue>]) -> Result<usize> {
        let mut stmt = self.tx.prepare(statement)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
        Ok(rows.len())
    }

    /// Whether a PRIMARY KEY or UNIQUE constraint covers exactly `primary_key`
    fn has_key_constraint(&self, table: &TableRef, primary_key: &[String]) -> Result<bool> {
        let mut stmt = self.tx.prepare(
            "SELECT array_to_string(constraint_column_names, ',')
             FROM duckdb_constraints()
             WHERE database_name = COALESCE(?, current_database())
               AND schema_name = ?
               AND table_name = ?
               AND constraint_type IN ('PRIMARY KEY', 'UNIQUE')",
        )?;
        let constraints: Vec<String> = stmt
            .query_map(
                params![
                    self.dialect.catalog.as_deref(),
                    self.dialect.schema_of(table),
                    table.name
                ],
                |row| row.get(0),
            )?
            .collect::<std::result::Result<_, _>>()?;

        let mut wanted: Vec<&str> = primary_key.iter().map(String::as_str).collect();
        wanted.sort_unstable();
        Ok(constraints.iter().any(|columns| {
            let mut declared: Vec<&str> = columns.split(',').collect();
            declared.sort_unstable();
            declared == wanted
        }))
    }

    fn delete_insert(
        &self,
        qualified: &str,
        schema: &ColumnSchema,
        primary_key: &[String],
        rows: &[Vec<CellValue>],
    ) -> Result<usize> {
        let positions: Vec<usize> = primary_key
            .iter()
            .map(|k| {
                schema
                    .position(k)
                    .ok_or_else(|| Error::validation(format!("primary key column '{k}' is not in the input")))
            })
            .collect::<Result<_>>()?;

        let mut delete = self.tx.prepare(&sql::delete_by_key(qualified, primary_key))?;
        let mut insert = self.tx.prepare(&sql::insert(qualified, schema))?;
        for row in rows {
            delete.execute(params_from_iter(positions.iter().map(|&i| &row[i])))?;
            insert.execute(params_from_iter(row.iter()))?;
        }
        Ok(rows.len())
    }
}

impl SinkTx for DuckDbTx<'_> {
    fn table_columns(&self, table: &TableRef) -> Result<Option<Vec<ExistingColumn>>> {
        let mut stmt = self.tx.prepare(
            "SELECT column_name, data_type
             FROM information_schema.columns
             WHERE table_catalog = COALESCE(?, current_database())
               AND table_schema = ?
               AND table_name = ?
             ORDER BY ordinal_position",
        )?;

        let columns: Vec<ExistingColumn> = stmt
            .query_map(
                params![
                    self.dialect.catalog.as_deref(),
                    self.dialect.schema_of(table),
                    table.name
                ],
                |row| {
                    Ok(ExistingColumn {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                    })
                },
            )?
            .collect::<std::result::Result<_, _>>()?;

        Ok(if columns.is_empty() { None } else { Some(columns) })
    }

    fn drop_table(&self, table: &TableRef) -> Result<()> {
        let statement = format!("DROP TABLE IF EXISTS {}", self.dialect.qualify(table));
        tracing::debug!("Executing: {}", statement);
        self.tx.execute_batch(&statement)?;
        Ok(())
    }

    fn create_table(&self, table: &TableRef, schema: &ColumnSchema, primary_key: &[String]) -> Result<()> {
        if self.dialect.schema_of(table) != self.dialect.default_schema {
            self.tx.execute_batch(&format!(
                "CREATE SCHEMA IF NOT EXISTS {}",
                self.dialect.qualify_schema(table)
            ))?;
        }
        let statement = sql::create_table(&self.dialect.qualify(table), schema, primary_key);
        tracing::debug!("Executing: {}", statement);
        self.tx.execute_batch(&statement)?;
        Ok(())
    }

    fn add_columns(&self, table: &TableRef, columns: &[Column]) -> Result<()> {
        let qualified = self.dialect.qualify(table);
        for column in columns {
            let statement = sql::add_column(&qualified, column);
            tracing::debug!("Executing: {}", statement);
            self.tx.execute_batch(&statement)?;
        }
        Ok(())
    }

    fn row_count(&self, table: &TableRef) -> Result<u64> {
        let count: i64 = self
            .tx
            .query_row(&sql::count(&self.dialect.qualify(table)), [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn append(&self, table: &TableRef, schema: &ColumnSchema, rows: &[Vec<CellValue>]) -> Result<usize> {
        self.insert_rows(&sql::insert(&self.dialect.qualify(table), schema), rows)
    }

    fn upsert(
        &self,
        table: &TableRef,
        schema: &ColumnSchema,
        primary_key: &[String],
        rows: &[Vec<CellValue>],
    ) -> Result<usize> {
        let qualified = self.dialect.qualify(table);
        match self.dialect.merge {
            MergeStrategy::OnConflict if self.has_key_constraint(table, primary_key)? => {
                self.insert_rows(&sql::upsert_on_conflict(&qualified, schema, primary_key), rows)
            }
            MergeStrategy::OnConflict => {
                tracing::warn!(
                    "{} has no key constraint on ({}), merging by delete and insert",
                    table,
                    primary_key.join(", ")
                );
                self.delete_insert(&qualified, schema, primary_key, rows)
            }
            MergeStrategy::DeleteInsert => self.delete_insert(&qualified, schema, primary_key, rows),
        }
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(v) => ToSqlOutput::Owned(Value::BigInt(*v)),
            CellValue::Float(v) => ToSqlOutput::Owned(Value::Double(*v)),
            CellValue::Boolean(v) => ToSqlOutput::Owned(Value::Boolean(*v)),
            CellValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}
