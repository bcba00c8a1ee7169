//! Load types: phases, upsert specification and reports

use crate::database::TableRef;
use crate::schema::{sanitize_name, ColumnSchema};
use serde::Serialize;
use std::fmt;

/// Progress of one load call.
///
/// `Pending -> SchemaInferred -> TableEnsured -> RowsApplied -> Committed`,
/// with `Failed` reachable from every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPhase {
    Pending,
    SchemaInferred,
    TableEnsured,
    RowsApplied,
    Committed,
    Failed,
}

impl LoadPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadPhase::Pending => "pending",
            LoadPhase::SchemaInferred => "schema-inferred",
            LoadPhase::TableEnsured => "table-ensured",
            LoadPhase::RowsApplied => "rows-applied",
            LoadPhase::Committed => "committed",
            LoadPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoadPhase::Committed | LoadPhase::Failed)
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target table and primary key for an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertSpec {
    pub table: TableRef,
    /// Sanitized key column names
    pub primary_keys: Vec<String>,
}

impl UpsertSpec {
    pub fn new<I, K>(table: TableRef, primary_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Self {
            table,
            primary_keys: primary_keys
                .into_iter()
                .map(|k| sanitize_name(k.as_ref().trim()))
                .collect(),
        }
    }
}

/// How rows reach the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadMode {
    Append { drop_existing: bool },
    Upsert { primary_keys: Vec<String> },
}

impl LoadMode {
    pub(crate) fn primary_keys(&self) -> &[String] {
        match self {
            LoadMode::Append { .. } => &[],
            LoadMode::Upsert { primary_keys } => primary_keys,
        }
    }
}

/// Outcome of a successful load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub phase: LoadPhase,
    /// Rows in the input, before key deduplication
    pub rows_in: usize,
    /// Rows written by the final attempt
    pub rows_applied: usize,
    pub inserted: u64,
    pub updated: u64,
    /// Attempts made, including the successful one
    pub attempts: u32,
    pub table_created: bool,
    pub columns_added: Vec<String>,
    #[serde(skip)]
    pub schema: ColumnSchema,
}

impl LoadReport {
    pub(crate) fn new(table: &TableRef, rows_in: usize) -> Self {
        Self {
            table: table.to_string(),
            phase: LoadPhase::Pending,
            rows_in,
            rows_applied: 0,
            inserted: 0,
            updated: 0,
            attempts: 0,
            table_created: false,
            columns_added: Vec::new(),
            schema: ColumnSchema::default(),
        }
    }
}
