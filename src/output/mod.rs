//! Output module
//!
//! CSV files: reading input tables and writing extracted ones.

mod path;
mod reader;
mod writer;

pub use path::{output_file_name, run_timestamp};
pub use reader::read_csv;
pub use writer::{write_csv, write_tables, CsvWriter, WrittenFile};
