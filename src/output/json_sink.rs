use crate::output::traits::{ExportRecord, OutputResult, RunStatus, Sink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Structured-document sink: a pretty-printed JSON array of full records
///
/// Records are buffered and written once at finish.
pub struct JsonSink {
    path: PathBuf,
    file: Option<File>,
    records: Vec<ExportRecord>,
}

impl JsonSink {
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            records: Vec::new(),
        })
    }
}

impl Sink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn write(&mut self, record: &ExportRecord) -> OutputResult<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn rollback(&mut self, record: &ExportRecord) -> OutputResult<()> {
        if self.records.last().map(|r| r.url.as_str()) == Some(record.url.as_str()) {
            self.records.pop();
        }
        Ok(())
    }

    fn finish(&mut self, _status: RunStatus) -> OutputResult<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
