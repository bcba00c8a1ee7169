//! Column types, schemas, typed cells and the raw string table

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred type of a column, narrowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    /// SQL type used when creating a column
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "VARCHAR",
        }
    }

    /// Whether values of this type can be stored in an existing column
    /// declared as `declared` without loss or a failed cast.
    pub fn fits_declared(self, declared: &str) -> bool {
        let declared = declared.trim().to_ascii_uppercase();
        let family = declared
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        let is_text = matches!(family, "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR");
        let is_int = matches!(
            family,
            "BIGINT" | "INTEGER" | "INT" | "INT8" | "INT4" | "HUGEINT" | "SMALLINT" | "TINYINT"
        );
        let is_float = matches!(
            family,
            "DOUBLE" | "FLOAT" | "REAL" | "FLOAT8" | "FLOAT4" | "DECIMAL" | "NUMERIC"
        );

        match self {
            ColumnType::Integer => is_int || is_float || is_text,
            ColumnType::Float => is_float || is_text,
            ColumnType::Boolean => family == "BOOLEAN" || family == "BOOL" || is_text,
            // Text can land in temporal columns when the strings are timestamps
            ColumnType::Text => {
                is_text || matches!(family, "TIMESTAMP" | "TIMESTAMPTZ" | "DATE" | "TIME")
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Text => "text",
        };
        f.write_str(name)
    }
}

/// One column of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Sanitized name used in the sink
    pub name: String,
    /// Header as it appeared in the input
    pub source_name: String,
    pub column_type: ColumnType,
}

/// Ordered list of typed columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of a column by sanitized name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Convert every row of `table` to typed cells.
    ///
    /// Empty cells and null tokens become `Null`. A value that does not parse as its
    /// column's type is a validation error naming the row and column.
    pub fn coerce(&self, table: &RawTable) -> Result<Vec<Vec<CellValue>>> {
        if table.headers().len() != self.columns.len() {
            return Err(Error::validation(format!(
                "table has {} columns, schema has {}",
                table.headers().len(),
                self.columns.len()
            )));
        }

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                row.iter()
                    .zip(&self.columns)
                    .map(|(raw, column)| {
                        CellValue::parse(raw, column.column_type).ok_or_else(|| {
                            Error::validation(format!(
                                "row {}: '{}' is not a valid {} for column '{}'",
                                row_index + 1,
                                raw,
                                column.column_type,
                                column.source_name
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

/// A typed cell ready to be bound to a statement
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    /// Parse a raw cell as `column_type`; `None` when it does not fit.
    /// Null tokens are `Null` in every column type.
    pub fn parse(raw: &str, column_type: ColumnType) -> Option<Self> {
        let trimmed = raw.trim();
        if is_null_token(trimmed) {
            return Some(CellValue::Null);
        }
        match column_type {
            ColumnType::Integer => parse_integer(trimmed).map(CellValue::Integer),
            ColumnType::Float => parse_float(trimmed).map(CellValue::Float),
            ColumnType::Boolean => parse_boolean(trimmed).map(CellValue::Boolean),
            ColumnType::Text => Some(CellValue::Text(raw.to_string())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Key form used for primary-key deduplication
    pub(crate) fn key_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// Cells that stand for a missing value: empty, `N/A` and `null`, any case
pub(crate) fn is_null_token(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("n/a") || value.eq_ignore_ascii_case("null")
}

pub(crate) fn parse_integer(value: &str) -> Option<i64> {
    value.parse::<i64>().ok()
}

/// Finite floats only; `NaN` and infinities are text
pub(crate) fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|f| f.is_finite())
}

pub(crate) fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Raw Table
// ============================================================================

/// Header plus rows of untyped string cells, as read from CSV or flattened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting rows whose width differs from the header
    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::validation(format!(
                "row {} has {} cells, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }
}
