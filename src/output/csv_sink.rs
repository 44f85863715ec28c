use crate::output::traits::{ExportRecord, OutputResult, RunStatus, Sink};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

const BASE_COLUMNS: &[&str] = &[
    "url",
    "title",
    "content_preview",
    "matched_keywords",
    "links_count",
    "depth",
    "crawl_time",
];

const ANNOTATION_COLUMNS: &[&str] = &[
    "ai_summary",
    "ai_sentiment",
    "ai_topics",
    "ai_entities",
    "ai_keywords",
];

/// Tabular sink: one CSV row per exported page
///
/// The header is written on creation, so the column set is fixed for the
/// life of the file. Each row is flushed before the next is written so the
/// last one can be cut off again by [`Sink::rollback`].
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    with_annotations: bool,
    /// File offset where the last written row starts
    row_start: Option<u64>,
}

impl CsvSink {
    pub fn create(path: &Path, with_annotations: bool) -> OutputResult<Self> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
        if with_annotations {
            header.extend_from_slice(ANNOTATION_COLUMNS);
        }
        writer.write_record(&header)?;
        writer.flush()?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            with_annotations,
            row_start: None,
        })
    }

    fn row(&self, record: &ExportRecord) -> Vec<String> {
        let mut row = vec![
            record.url.clone(),
            record.title.clone(),
            record.content_preview.clone(),
            record.matched_keywords.join(", "),
            record.links_count.to_string(),
            record.depth.to_string(),
            record.crawl_time.clone(),
        ];

        if self.with_annotations {
            let annotation = record.annotation.clone().unwrap_or_default();
            row.push(annotation.summary.unwrap_or_default());
            row.push(annotation.sentiment.unwrap_or_default());
            row.push(annotation.topics.join(", "));
            row.push(annotation.entities.join(", "));
            row.push(annotation.keywords.join(", "));
        }

        row
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn write(&mut self, record: &ExportRecord) -> OutputResult<()> {
        let row = self.row(record);
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            self.row_start = Some(writer.get_ref().metadata()?.len());
            writer.write_record(&row)?;
        }
        Ok(())
    }

    fn rollback(&mut self, _record: &ExportRecord) -> OutputResult<()> {
        let (Some(writer), Some(offset)) = (self.writer.as_mut(), self.row_start.take()) else {
            return Ok(());
        };
        writer.flush()?;
        let mut file = writer.get_ref();
        file.set_len(offset)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn finish(&mut self, _status: RunStatus) -> OutputResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
