//! Output module for exporting retained pages
//!
//! This module handles:
//! - Fanning records out to the configured sinks
//! - CSV, JSON and SQLite record formats
//! - Printing the end-of-run report

mod csv_sink;
mod exporter;
mod json_sink;
mod sqlite_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use exporter::Exporter;
pub use json_sink::JsonSink;
pub use sqlite_sink::SqliteSink;
pub use stats::{print_report, print_snapshot};
pub use traits::{
    preview, ExportRecord, ExportSummary, OutputError, OutputResult, RunInfo, RunStatus, Sink,
    MAX_EXPORTED_LINKS,
};
