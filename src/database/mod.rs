//! Database sinks
//!
//! The loader talks to a [`Sink`]; [`DuckDbSink`] is the embedded
//! implementation, able to write locally or into an attached PostgreSQL
//! database.

mod engine;
mod sink;
pub mod sql;

pub use engine::{mask_password, DuckDbSink, PostgresSettings, SinkTarget};
pub use sink::{quote_ident, Dialect, ExistingColumn, MergeStrategy, Sink, SinkTx, TableRef};
