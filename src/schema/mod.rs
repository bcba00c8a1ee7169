//! Schema inference module
//!
//! Infers column types for tabular string data and converts rows to typed
//! cells.
//!
//! # Features
//!
//! - **Type Inference**: integer, float, boolean or text per column, over all rows
//! - **Null Tolerance**: empty cells never veto a type
//! - **Name Sanitizing**: headers become safe lower-case identifiers
//! - **Coercion**: rows become typed cells matching the schema

mod inference;
mod sanitize;
mod types;

pub use inference::{infer_schema, SchemaInferrer};
pub use sanitize::{sanitize_columns, sanitize_name};
pub use types::{CellValue, Column, ColumnSchema, ColumnType, RawTable};

#[cfg(test)]
mod tests;
