//! Bulk loading and upserts
//!
//! A load infers a schema from the string table, makes sure the target
//! table can hold it, then appends or merges rows in one transaction.
//!
//! # Phases
//!
//! `pending -> schema-inferred -> table-ensured -> rows-applied -> committed`.
//! A failure reports the phase it happened in; on a transactional sink the
//! table is left exactly as it was.

mod engine;
mod types;

pub use engine::BulkLoader;
pub use types::{LoadPhase, LoadReport, UpsertSpec};
