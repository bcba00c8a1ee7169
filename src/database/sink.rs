//! Sink abstraction used by the bulk loader
//!
//! A sink hands out transactions; everything a load does happens inside
//! one. Dropping a transaction without committing rolls it back.

use crate::error::Result;
use crate::schema::{sanitize_name, CellValue, Column, ColumnSchema};

/// How rows are merged on primary-key conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// `INSERT ... ON CONFLICT (...) DO UPDATE SET ...`
    OnConflict,
    /// Delete the row with the same key, then insert
    DeleteInsert,
}

/// Naming and merge rules of one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Catalog prefix for attached databases
    pub catalog: Option<String>,
    /// Schema used when a table names none
    pub default_schema: String,
    pub merge: MergeStrategy,
}

impl Dialect {
    pub fn duckdb() -> Self {
        Self {
            catalog: None,
            default_schema: "main".to_string(),
            merge: MergeStrategy::OnConflict,
        }
    }

    pub fn attached_postgres(catalog: impl Into<String>) -> Self {
        Self {
            catalog: Some(catalog.into()),
            default_schema: "public".to_string(),
            merge: MergeStrategy::DeleteInsert,
        }
    }

    /// Schema a table lives in under this dialect
    pub fn schema_of<'a>(&'a self, table: &'a TableRef) -> &'a str {
        table.schema.as_deref().unwrap_or(&self.default_schema)
    }

    /// Fully qualified, quoted table name
    pub fn qualify(&self, table: &TableRef) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(ref catalog) = self.catalog {
            parts.push(quote_ident(catalog));
        }
        parts.push(quote_ident(self.schema_of(table)));
        parts.push(quote_ident(&table.name));
        parts.join(".")
    }

    /// Quoted `catalog.schema` for schema creation
    pub fn qualify_schema(&self, table: &TableRef) -> String {
        match self.catalog {
            Some(ref catalog) => format!(
                "{}.{}",
                quote_ident(catalog),
                quote_ident(self.schema_of(table))
            ),
            None => quote_ident(self.schema_of(table)),
        }
    }
}

/// Target table, with names already sanitized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: sanitize_name(name),
        }
    }

    #[must_use]
    pub fn in_schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(sanitize_name);
        self
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.schema {
            Some(ref schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A column as declared in the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingColumn {
    pub name: String,
    pub data_type: String,
}

/// A destination that can open transactions
pub trait Sink {
    fn dialect(&self) -> &Dialect;

    /// Start a transaction; it rolls back if dropped before `commit`
    fn begin(&mut self) -> Result<Box<dyn SinkTx + '_>>;

    /// Human-readable target description with secrets masked
    fn describe(&self) -> String;

    /// Whether an uncommitted transaction leaves no trace. Loads into sinks
    /// that return false are best-effort on failure.
    fn supports_transactions(&self) -> bool {
        true
    }
}

/// Operations available inside a sink transaction
pub trait SinkTx {
    /// Columns of `table`, or `None` if it does not exist
    fn table_columns(&self, table: &TableRef) -> Result<Option<Vec<ExistingColumn>>>;

    fn drop_table(&self, table: &TableRef) -> Result<()>;

    /// Create `table` (and its schema) if missing, with an optional primary key
    fn create_table(&self, table: &TableRef, schema: &ColumnSchema, primary_key: &[String]) -> Result<()>;

    fn add_columns(&self, table: &TableRef, columns: &[Column]) -> Result<()>;

    fn row_count(&self, table: &TableRef) -> Result<u64>;

    /// Insert every row; returns rows written
    fn append(&self, table: &TableRef, schema: &ColumnSchema, rows: &[Vec<CellValue>]) -> Result<usize>;

    /// Insert or overwrite rows by primary key; returns rows written
    fn upsert(
        &self,
        table: &TableRef,
        schema: &ColumnSchema,
        primary_key: &[String],
        rows: &[Vec<CellValue>],
    ) -> Result<usize>;

    fn commit(self: Box<Self>) -> Result<()>;
}
