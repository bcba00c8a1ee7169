//! Column type inference over string tables
//!
//! Every row is considered. A column starts out as a candidate for each
//! type and loses a candidate on the first value that does not parse as
//! it; empty cells and null tokens (`N/A`, `null`) never rule anything out.
//! The narrowest surviving type wins in the order integer, float, boolean,
//! text, and a column with no values at all is text.

use super::sanitize::sanitize_columns;
use super::types::{
    is_null_token, parse_boolean, parse_float, parse_integer, Column, ColumnSchema, ColumnType, RawTable,
};
use crate::error::Result;

/// Schema inferrer with configuration options
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Recognise true/false, yes/no and 1/0 columns as booleans
    detect_booleans: bool,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    pub fn new() -> Self {
        Self {
            detect_booleans: true,
        }
    }

    /// Enable/disable boolean detection
    #[must_use]
    pub fn with_boolean_detection(mut self, enabled: bool) -> Self {
        self.detect_booleans = enabled;
        self
    }

    /// Infer a schema for every column of `table`
    pub fn infer(&self, table: &RawTable) -> Result<ColumnSchema> {
        let names = sanitize_columns(table.headers())?;

        let columns = names
            .into_iter()
            .zip(table.headers())
            .enumerate()
            .map(|(index, (name, source_name))| Column {
                name,
                source_name: source_name.clone(),
                column_type: self.infer_column(table.column_values(index)),
            })
            .collect();

        Ok(ColumnSchema::new(columns))
    }

    /// Infer the type of a single column from its values
    pub fn infer_column<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> ColumnType {
        let mut candidates = Candidates {
            integer: true,
            float: true,
            boolean: self.detect_booleans,
            seen_value: false,
        };

        for value in values {
            let value = value.trim();
            if is_null_token(value) {
                continue;
            }
            candidates.seen_value = true;
            candidates.observe(value);
            if candidates.only_text() {
                break;
            }
        }

        candidates.resolve()
    }
}

struct Candidates {
    integer: bool,
    float: bool,
    boolean: bool,
    seen_value: bool,
}

impl Candidates {
    fn observe(&mut self, value: &str) {
        if self.integer && parse_integer(value).is_none() {
            self.integer = false;
        }
        if self.float && parse_float(value).is_none() {
            self.float = false;
        }
        if self.boolean && parse_boolean(value).is_none() {
            self.boolean = false;
        }
    }

    fn only_text(&self) -> bool {
        !(self.integer || self.float || self.boolean)
    }

    fn resolve(&self) -> ColumnType {
        if !self.seen_value {
            ColumnType::Text
        } else if self.integer {
            ColumnType::Integer
        } else if self.float {
            ColumnType::Float
        } else if self.boolean {
            ColumnType::Boolean
        } else {
            ColumnType::Text
        }
    }
}

/// Infer a schema with default settings
pub fn infer_schema(table: &RawTable) -> Result<ColumnSchema> {
    SchemaInferrer::new().infer(table)
}
