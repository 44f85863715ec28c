//! Sink trait and the record types that flow through the exporter

use crate::enrich::AnnotationResult;
use crate::pipeline::MatchResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Links kept in the `links_found` field of an exported record
pub const MAX_EXPORTED_LINKS: usize = 50;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Exporter already finalized")]
    ExporterClosed,

    #[error("Exporter stopped after an earlier sink failure")]
    ExporterFailed,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Final status of a crawl run, as recorded by sinks that keep run metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

/// Metadata shared by every sink of one run
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,
    pub config_hash: String,
}

impl RunInfo {
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            config_hash: config_hash.into(),
        }
    }

    /// Base file name shared by all sinks, e.g. `crawl_results_20240131_154500`
    pub fn file_stem(&self) -> String {
        self.started_at
            .format("crawl_results_%Y%m%d_%H%M%S")
            .to_string()
    }
}

/// One exported page as the sinks see it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub url: String,
    pub title: String,
    pub cleaned_text: String,
    pub content_preview: String,
    pub matched_keywords: Vec<String>,
    pub links_found: Vec<String>,
    pub links_count: usize,
    pub depth: u32,
    /// RFC 3339 timestamp of the fetch
    pub crawl_time: String,
    /// Fetch duration in seconds
    pub loading_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationResult>,
}

impl ExportRecord {
    pub fn from_match(
        result: &MatchResult,
        preview_len: usize,
        annotation: Option<AnnotationResult>,
    ) -> Self {
        let record = &result.record;
        Self {
            url: record.url.to_string(),
            title: record.title.clone(),
            cleaned_text: record.cleaned_text.clone(),
            content_preview: preview(&record.cleaned_text, preview_len),
            matched_keywords: result.matched_keywords.clone(),
            links_found: record
                .outbound_links
                .iter()
                .take(MAX_EXPORTED_LINKS)
                .map(|u| u.to_string())
                .collect(),
            links_count: record.outbound_links.len(),
            depth: record.depth,
            crawl_time: record
                .fetched_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            loading_time: record.fetch_time.as_secs_f64(),
            annotation,
        }
    }
}

/// Truncates text to `max_chars` characters, appending `...` when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// A destination for exported records
///
/// Sinks are only ever driven by the exporter, which holds them behind a
/// single lock, so implementations need no internal synchronization.
pub trait Sink: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Path of the file this sink writes, if any
    fn path(&self) -> Option<&Path>;

    fn write(&mut self, record: &ExportRecord) -> OutputResult<()>;

    /// Undoes the most recent `write` of `record`
    ///
    /// Called when another sink failed on the same record, so every sink
    /// keeps the same set of pages. A no-op if the record was never written.
    fn rollback(&mut self, record: &ExportRecord) -> OutputResult<()>;

    /// Flushes and closes the sink; called exactly once
    fn finish(&mut self, status: RunStatus) -> OutputResult<()>;
}

/// What the exporter produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub records_written: u64,
    pub files: Vec<PathBuf>,
}
