use crate::config::{OutputConfig, OutputFormat};
use crate::enrich::Annotator;
use crate::output::csv_sink::CsvSink;
use crate::output::json_sink::JsonSink;
use crate::output::sqlite_sink::SqliteSink;
use crate::output::traits::{
    ExportRecord, ExportSummary, OutputError, OutputResult, RunInfo, RunStatus, Sink,
};
use crate::pipeline::MatchResult;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

struct ExporterInner {
    sinks: Vec<Box<dyn Sink>>,
    records_written: u64,
    closed: bool,
    /// Set once a sink write fails; no further records are accepted
    failed: bool,
}

/// Fans each retained page out to every configured sink
///
/// All sink writes happen under one lock, so sinks always receive the same
/// records in the same order. If one sink fails on a record, the sinks that
/// already took it roll it back and the exporter refuses later records.
pub struct Exporter {
    inner: Mutex<ExporterInner>,
    annotator: Option<Arc<dyn Annotator>>,
    preview_len: usize,
}

impl Exporter {
    pub fn new(sinks: Vec<Box<dyn Sink>>, preview_len: usize) -> Self {
        Self {
            inner: Mutex::new(ExporterInner {
                sinks,
                records_written: 0,
                closed: false,
                failed: false,
            }),
            annotator: None,
            preview_len,
        }
    }

    pub fn with_annotator(mut self, annotator: Arc<dyn Annotator>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Opens the configured sinks under `config.directory`
    ///
    /// Every file is named after the run's start time, e.g.
    /// `crawl_results_20240131_154500.csv`. `with_annotations` adds the
    /// enrichment columns to the CSV header.
    pub fn from_config(
        config: &OutputConfig,
        run: &RunInfo,
        with_annotations: bool,
    ) -> OutputResult<Self> {
        let dir = Path::new(&config.directory);
        std::fs::create_dir_all(dir)?;
        let stem = run.file_stem();

        let mut sinks: Vec<Box<dyn Sink>> = Vec::with_capacity(config.formats.len());
        for format in &config.formats {
            let path = dir.join(format!("{}.{}", stem, format.extension()));
            let sink: Box<dyn Sink> = match format {
                OutputFormat::Csv => Box::new(CsvSink::create(&path, with_annotations)?),
                OutputFormat::Json => Box::new(JsonSink::create(&path)?),
                OutputFormat::Sqlite => Box::new(SqliteSink::open(&path, run)?),
            };
            info!("Writing {} output to {}", sink.name(), path.display());
            sinks.push(sink);
        }

        Ok(Self::new(sinks, config.content_preview_length))
    }

    /// Exports one page to every sink
    ///
    /// When an annotator is configured the page is annotated first; an
    /// annotation failure is logged and the page is exported without it.
    pub async fn export(&self, result: &MatchResult) -> OutputResult<()> {
        {
            let inner = self.inner.lock().await;
            if inner.closed {
                return Err(OutputError::ExporterClosed);
            }
            if inner.failed {
                return Err(OutputError::ExporterFailed);
            }
        }

        let annotation = match &self.annotator {
            Some(annotator) => match annotator.annotate(&result.record).await {
                Ok(annotation) => Some(annotation),
                Err(e) => {
                    warn!("Annotation failed for {}: {}", result.record.url, e);
                    None
                }
            },
            None => None,
        };

        let record = ExportRecord::from_match(result, self.preview_len, annotation);

        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(OutputError::ExporterClosed);
        }
        if inner.failed {
            return Err(OutputError::ExporterFailed);
        }

        let mut failure = None;
        for (i, sink) in inner.sinks.iter_mut().enumerate() {
            if let Err(e) = sink.write(&record) {
                error!("{} sink failed writing {}: {}", sink.name(), record.url, e);
                failure = Some((i, e));
                break;
            }
        }

        if let Some((failed_at, e)) = failure {
            for sink in inner.sinks[..=failed_at].iter_mut() {
                if let Err(rollback_err) = sink.rollback(&record) {
                    error!(
                        "{} sink failed rolling back {}: {}",
                        sink.name(),
                        record.url,
                        rollback_err
                    );
                }
            }
            inner.failed = true;
            return Err(e);
        }

        inner.records_written += 1;
        Ok(())
    }

    /// Flushes and closes all sinks, recording the run as completed
    pub async fn finalize(&self) -> OutputResult<ExportSummary> {
        self.finalize_as(RunStatus::Completed).await
    }

    /// Flushes and closes all sinks exactly once
    ///
    /// Every sink is finished even if an earlier one fails; the first
    /// failure is returned.
    pub async fn finalize_as(&self, status: RunStatus) -> OutputResult<ExportSummary> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(OutputError::ExporterClosed);
        }
        inner.closed = true;

        let mut first_error = None;
        let mut files = Vec::new();
        for sink in inner.sinks.iter_mut() {
            match sink.finish(status) {
                Ok(()) => {
                    if let Some(path) = sink.path() {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    error!("Failed to finish {} sink: {}", sink.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(ExportSummary {
            records_written: inner.records_written,
            files,
        })
    }

    pub async fn records_written(&self) -> u64 {
        self.inner.lock().await.records_written
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}
