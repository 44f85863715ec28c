//! SQLite sink
//!
//! Keeps one `runs` row per crawl and one `records` row per exported URL.

use crate::output::traits::{ExportRecord, OutputResult, RunInfo, RunStatus, Sink};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQL schema for the results database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per exported page
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    cleaned_text TEXT NOT NULL,
    content_preview TEXT NOT NULL,
    matched_keywords TEXT NOT NULL,
    links_found TEXT NOT NULL,
    links_count INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    crawl_time TEXT NOT NULL,
    loading_time REAL NOT NULL,
    annotation TEXT
);

CREATE INDEX IF NOT EXISTS idx_records_run ON records(run_id);
"#;

/// Creates tables and indexes if they don't exist
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

pub struct SqliteSink {
    path: PathBuf,
    conn: Connection,
    run_id: i64,
}

impl SqliteSink {
    /// Opens (or creates) the database and registers a running run
    pub fn open(path: &Path, run: &RunInfo) -> OutputResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                run.started_at.to_rfc3339(),
                run.config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = conn.last_insert_rowid();

        Ok(Self {
            path: path.to_path_buf(),
            conn,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn write(&mut self, record: &ExportRecord) -> OutputResult<()> {
        let annotation = record
            .annotation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT OR IGNORE INTO records (
                run_id, url, title, cleaned_text, content_preview, matched_keywords,
                links_found, links_count, depth, crawl_time, loading_time, annotation
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                self.run_id,
                record.url,
                record.title,
                record.cleaned_text,
                record.content_preview,
                serde_json::to_string(&record.matched_keywords)?,
                serde_json::to_string(&record.links_found)?,
                record.links_count as i64,
                record.depth,
                record.crawl_time,
                record.loading_time,
                annotation,
            ],
        )?;
        Ok(())
    }

    fn rollback(&mut self, record: &ExportRecord) -> OutputResult<()> {
        self.conn.execute(
            "DELETE FROM records WHERE url = ?1 AND run_id = ?2",
            params![record.url, self.run_id],
        )?;
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> OutputResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), Utc::now().to_rfc3339(), self.run_id],
        )?;
        Ok(())
    }
}
