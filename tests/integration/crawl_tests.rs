//! Integration tests for the crawler
//!
//! Most tests drive the coordinator with an in-memory fetcher so the crawl
//! is deterministic. The last test runs the full stack against a wiremock
//! server.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use sumi_sift::config::{CrawlerConfig, FilterMode, OutputConfig, OutputFormat, UserAgentConfig};
use sumi_sift::crawler::{Coordinator, CrawlSettings, StopHandle, StopReason};
use sumi_sift::fetch::{FetchError, FetchErrorKind, FetchResponse, Fetcher, HttpFetcher};
use sumi_sift::output::{
    CsvSink, ExportRecord, Exporter, JsonSink, OutputError, OutputResult, RunInfo, RunStatus,
    Sink, SqliteSink,
};
use sumi_sift::{EntryState, SiftError};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

enum Reply {
    Html(String),
    Error(FetchErrorKind),
}

/// Serves canned replies keyed by URL; unknown URLs 404
#[derive(Default)]
struct MemoryFetcher {
    replies: HashMap<String, Reply>,
    delay: Option<Duration>,
    /// Requested when any fetch starts, once set
    stop_on_fetch: OnceLock<StopHandle>,
}

impl MemoryFetcher {
    fn page(mut self, url: &str, html: &str) -> Self {
        self.replies
            .insert(url.to_string(), Reply::Html(html.to_string()));
        self
    }

    fn error(mut self, url: &str, kind: FetchErrorKind) -> Self {
        self.replies.insert(url.to_string(), Reply::Error(kind));
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        if let Some(stop) = self.stop_on_fetch.get() {
            stop.request_stop();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.get(url.as_str()) {
            Some(Reply::Html(body)) => Ok(FetchResponse {
                final_url: url.clone(),
                status_code: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                headers: HashMap::new(),
                body: body.as_bytes().to_vec(),
            }),
            Some(Reply::Error(kind)) => Err(FetchError::new(*kind, url, "canned failure")),
            None => Err(FetchError::new(
                FetchErrorKind::HttpError(404),
                url,
                "Not Found",
            )),
        }
    }
}

/// Sink whose writes always fail
struct BrokenSink;

impl Sink for BrokenSink {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn path(&self) -> Option<&Path> {
        None
    }

    fn write(&mut self, _record: &ExportRecord) -> OutputResult<()> {
        Err(OutputError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn rollback(&mut self, _record: &ExportRecord) -> OutputResult<()> {
        Ok(())
    }

    fn finish(&mut self, _status: RunStatus) -> OutputResult<()> {
        Ok(())
    }
}

fn settings(seeds: &[&str], max_depth: u32, keywords: &[&str]) -> CrawlSettings {
    CrawlSettings {
        seeds: seeds.iter().map(|s| s.to_string()).collect(),
        max_depth,
        max_concurrency: 4,
        max_pages: None,
        max_duration: None,
        allowed_domain: None,
        include_subdomains: true,
        denied_extensions: sumi_sift::url::default_denied_extensions(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        filter_mode: FilterMode::Filter,
    }
}

fn file_exporter(dir: &TempDir, formats: Vec<OutputFormat>) -> Arc<Exporter> {
    let config = OutputConfig {
        directory: dir.path().to_string_lossy().into_owned(),
        formats,
        content_preview_length: 200,
    };
    let exporter = Exporter::from_config(&config, &RunInfo::new("test-hash"), false)
        .expect("Failed to open sinks");
    Arc::new(exporter)
}

fn file_with_extension(files: &[PathBuf], ext: &str) -> PathBuf {
    files
        .iter()
        .find(|f| f.extension().and_then(|e| e.to_str()) == Some(ext))
        .cloned()
        .unwrap_or_else(|| panic!("no .{} output file", ext))
}

fn csv_urls(path: &Path) -> BTreeSet<String> {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV");
    let headers = reader.headers().expect("CSV header").clone();
    let url_col = headers
        .iter()
        .position(|h| h == "url")
        .expect("url column");
    reader
        .records()
        .map(|r| r.expect("CSV row")[url_col].to_string())
        .collect()
}

fn json_urls(path: &Path) -> BTreeSet<String> {
    let text = std::fs::read_to_string(path).expect("Failed to read JSON");
    let records: Vec<serde_json::Value> = serde_json::from_str(&text).expect("JSON array");
    records
        .iter()
        .map(|r| r["url"].as_str().expect("url field").to_string())
        .collect()
}

fn sqlite_urls(path: &Path) -> BTreeSet<String> {
    let conn = rusqlite::Connection::open(path).expect("Failed to open database");
    let mut stmt = conn.prepare("SELECT url FROM records").expect("prepare");
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .expect("query");
    rows.map(|r| r.expect("row")).collect()
}

fn sqlite_run_status(path: &Path) -> String {
    let conn = rusqlite::Connection::open(path).expect("Failed to open database");
    conn.query_row("SELECT status FROM runs ORDER BY id DESC LIMIT 1", [], |row| {
        row.get(0)
    })
    .expect("run row")
}

fn set(urls: &[&str]) -> BTreeSet<String> {
    urls.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_keyword_filter_crawl() {
    let fetcher = MemoryFetcher::default()
        .page(
            "http://a.test/",
            r#"<html><body><p>foo lives here</p><a href="/b">b</a><a href="/c">c</a></body></html>"#,
        )
        .page("http://a.test/b", "<html><body><p>more FOO</p></body></html>")
        .page("http://a.test/c", "<html><body><p>nothing to see</p></body></html>");

    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(&dir, vec![OutputFormat::Csv, OutputFormat::Json]);
    let mut coordinator = Coordinator::new(
        settings(&["http://a.test/"], 1, &["foo"]),
        Arc::new(fetcher),
        exporter,
    )
    .expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(report.stats.pages_fetched, 3);
    assert_eq!(report.stats.pages_matched, 2);
    assert_eq!(report.stats.pages_exported, 2);
    assert_eq!(report.stats.errors, 0);

    assert_eq!(
        coordinator.outcome("http://a.test/"),
        Some(EntryState::VisitedMatched)
    );
    assert_eq!(
        coordinator.outcome("http://a.test/b"),
        Some(EntryState::VisitedMatched)
    );
    assert_eq!(
        coordinator.outcome("http://a.test/c"),
        Some(EntryState::VisitedUnmatched)
    );

    let export = report.export.expect("export summary");
    let csv = csv_urls(&file_with_extension(&export.files, "csv"));
    assert_eq!(csv, set(&["http://a.test/", "http://a.test/b"]));
}

#[tokio::test]
async fn test_timeout_seed_counts_error() {
    let fetcher = MemoryFetcher::default().error("http://a.test/", FetchErrorKind::Timeout);

    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(&dir, vec![OutputFormat::Json]);
    let mut coordinator = Coordinator::new(
        settings(&["http://a.test/"], 2, &["foo"]),
        Arc::new(fetcher),
        exporter,
    )
    .expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(report.stats.errors, 1);
    assert_eq!(report.stats.pages_fetched, 0);
    assert_eq!(report.stats.pages_exported, 0);
    assert_eq!(
        coordinator.outcome("http://a.test/"),
        Some(EntryState::VisitedError)
    );

    let export = report.export.expect("export summary");
    assert!(json_urls(&file_with_extension(&export.files, "json")).is_empty());
}

#[tokio::test]
async fn test_all_sinks_hold_same_urls() {
    let fetcher = MemoryFetcher::default()
        .page(
            "http://a.test/",
            r#"<body>rust <a href="/one">1</a> <a href="/two">2</a> <a href="/three">3</a></body>"#,
        )
        .page("http://a.test/one", r#"<body>Rust again <a href="/">home</a></body>"#)
        .page("http://a.test/two", "<body>python</body>")
        .page("http://a.test/three", "<body>rusty nails</body>");

    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(
        &dir,
        vec![OutputFormat::Csv, OutputFormat::Json, OutputFormat::Sqlite],
    );
    let mut coordinator = Coordinator::new(
        settings(&["http://a.test/"], 3, &["rust"]),
        Arc::new(fetcher),
        exporter,
    )
    .expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");
    let export = report.export.expect("export summary");
    assert_eq!(export.files.len(), 3);
    assert_eq!(export.records_written, 3);

    let csv = csv_urls(&file_with_extension(&export.files, "csv"));
    let json = json_urls(&file_with_extension(&export.files, "json"));
    let db = file_with_extension(&export.files, "db");
    let sqlite = sqlite_urls(&db);

    assert_eq!(
        csv,
        set(&["http://a.test/", "http://a.test/one", "http://a.test/three"])
    );
    assert_eq!(csv, json);
    assert_eq!(csv, sqlite);
    assert_eq!(sqlite_run_status(&db), "completed");
}

#[tokio::test]
async fn test_passthrough_exports_unmatched_pages() {
    let fetcher = MemoryFetcher::default()
        .page("http://a.test/", r#"<body>foo <a href="/c">c</a></body>"#)
        .page("http://a.test/c", "<body>nothing</body>");

    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(&dir, vec![OutputFormat::Json]);
    let mut crawl = settings(&["http://a.test/"], 1, &["foo"]);
    crawl.filter_mode = FilterMode::Passthrough;
    let mut coordinator =
        Coordinator::new(crawl, Arc::new(fetcher), exporter).expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");
    assert_eq!(report.stats.pages_matched, 1);
    assert_eq!(report.stats.pages_exported, 2);

    let export = report.export.expect("export summary");
    let text = std::fs::read_to_string(file_with_extension(&export.files, "json"))
        .expect("Failed to read JSON");
    let records: Vec<serde_json::Value> = serde_json::from_str(&text).expect("JSON array");
    let unmatched = records
        .iter()
        .find(|r| r["url"] == "http://a.test/c")
        .expect("unmatched page exported");
    assert_eq!(unmatched["matched_keywords"], serde_json::json!([]));
    assert_eq!(
        coordinator.outcome("http://a.test/c"),
        Some(EntryState::VisitedUnmatched)
    );
}

#[tokio::test]
async fn test_page_limit_bounds_dispatch() {
    let mut fetcher = MemoryFetcher::default().page(
        "http://a.test/",
        r#"<body>foo <a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/4">4</a></body>"#,
    );
    for i in 1..=4 {
        fetcher = fetcher.page(&format!("http://a.test/{}", i), "<body>foo</body>");
    }

    let mut crawl = settings(&["http://a.test/"], 1, &["foo"]);
    crawl.max_pages = Some(2);
    crawl.max_concurrency = 1;
    let mut coordinator = Coordinator::new(
        crawl,
        Arc::new(fetcher),
        Arc::new(Exporter::new(vec![], 200)),
    )
    .expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");
    assert_eq!(report.stop_reason, StopReason::PageLimit);
    assert_eq!(report.stats.pages_dispatched, 2);
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(
        coordinator.outcome("http://a.test/2"),
        Some(EntryState::Pending)
    );
}

#[tokio::test]
async fn test_time_limit_stops_dispatch() {
    let fetcher = MemoryFetcher::default()
        .page("http://a.test/", r#"<body>foo <a href="/next">n</a></body>"#)
        .page("http://a.test/next", "<body>foo</body>")
        .with_delay(Duration::from_millis(300));

    let mut crawl = settings(&["http://a.test/"], 1, &["foo"]);
    crawl.max_duration = Some(Duration::from_millis(50));
    let mut coordinator = Coordinator::new(
        crawl,
        Arc::new(fetcher),
        Arc::new(Exporter::new(vec![], 200)),
    )
    .expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");
    assert_eq!(report.stop_reason, StopReason::TimeLimit);
    assert_eq!(report.stats.pages_dispatched, 1);
    // the in-flight seed still drains through the pipeline
    assert_eq!(report.stats.pages_exported, 1);
}

#[tokio::test]
async fn test_stop_drains_in_flight_pages() {
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .page("http://a.test/", r#"<body>foo <a href="/next">n</a></body>"#)
            .page("http://a.test/next", "<body>foo</body>"),
    );

    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(&dir, vec![OutputFormat::Sqlite]);
    let mut coordinator = Coordinator::new(
        settings(&["http://a.test/"], 1, &["foo"]),
        Arc::clone(&fetcher),
        exporter,
    )
    .expect("Failed to create coordinator");
    let _ = fetcher.stop_on_fetch.set(coordinator.stop_handle());

    let report = coordinator.run().await.expect("Crawl failed");
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.stats.pages_dispatched, 1);
    assert_eq!(report.stats.pages_exported, 1);
    assert_eq!(
        coordinator.outcome("http://a.test/next"),
        Some(EntryState::Pending)
    );

    let export = report.export.expect("export summary");
    let db = file_with_extension(&export.files, "db");
    assert_eq!(sqlite_run_status(&db), "interrupted");
}

#[tokio::test]
async fn test_export_failure_fails_crawl() {
    let fetcher = MemoryFetcher::default()
        .page("http://a.test/", r#"<body>foo <a href="/next">n</a></body>"#)
        .page("http://a.test/next", "<body>foo</body>");

    let exporter = Arc::new(Exporter::new(vec![Box::new(BrokenSink)], 200));
    let mut coordinator = Coordinator::new(
        settings(&["http://a.test/"], 1, &["foo"]),
        Arc::new(fetcher),
        Arc::clone(&exporter),
    )
    .expect("Failed to create coordinator");
    let stats = coordinator.stats();

    let result = coordinator.run().await;
    assert!(matches!(result, Err(SiftError::Output(OutputError::Io(_)))));
    assert_eq!(stats.snapshot().pages_dispatched, 1);
    assert_eq!(stats.snapshot().pages_exported, 0);
    assert!(exporter.is_closed().await);
}

#[tokio::test]
async fn test_export_failure_leaves_sinks_consistent() {
    let fetcher = MemoryFetcher::default()
        .page("http://a.test/", r#"<body>foo <a href="/next">n</a></body>"#)
        .page("http://a.test/next", "<body>foo</body>");

    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = dir.path().join("out.csv");
    let json_path = dir.path().join("out.json");
    let db_path = dir.path().join("out.db");
    let sinks: Vec<Box<dyn Sink>> = vec![
        Box::new(CsvSink::create(&csv_path, false).expect("csv")),
        Box::new(JsonSink::create(&json_path).expect("json")),
        Box::new(SqliteSink::open(&db_path, &RunInfo::new("hash")).expect("sqlite")),
        Box::new(BrokenSink),
    ];
    let exporter = Arc::new(Exporter::new(sinks, 200));
    let mut coordinator = Coordinator::new(
        settings(&["http://a.test/"], 1, &["foo"]),
        Arc::new(fetcher),
        exporter,
    )
    .expect("Failed to create coordinator");

    let result = coordinator.run().await;
    assert!(matches!(result, Err(SiftError::Output(OutputError::Io(_)))));

    assert!(csv_urls(&csv_path).is_empty());
    assert!(json_urls(&json_path).is_empty());
    assert!(sqlite_urls(&db_path).is_empty());
    assert_eq!(sqlite_run_status(&db_path), "failed");
}

#[tokio::test]
async fn test_out_of_scope_seeds_rejected() {
    let mut crawl = settings(&["http://other.test/"], 1, &["foo"]);
    crawl.allowed_domain = Some("a.test".to_string());

    let result = Coordinator::new(
        crawl,
        Arc::new(MemoryFetcher::default()),
        Arc::new(Exporter::new(vec![], 200)),
    );
    assert!(matches!(result, Err(SiftError::Config(_))));
}

#[tokio::test]
async fn test_rejected_seeds_leave_valid_outputs() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(
        &dir,
        vec![OutputFormat::Csv, OutputFormat::Json, OutputFormat::Sqlite],
    );

    // denied extension, so the only seed never reaches the frontier
    let result = Coordinator::new(
        settings(&["http://a.test/report.pdf"], 1, &["foo"]),
        Arc::new(MemoryFetcher::default()),
        Arc::clone(&exporter),
    );
    assert!(matches!(result, Err(SiftError::Config(_))));

    let export = exporter
        .finalize_as(RunStatus::Failed)
        .await
        .expect("Failed to finalize");
    assert!(csv_urls(&file_with_extension(&export.files, "csv")).is_empty());
    assert!(json_urls(&file_with_extension(&export.files, "json")).is_empty());
    let db = file_with_extension(&export.files, "db");
    assert!(sqlite_urls(&db).is_empty());
    assert_eq!(sqlite_run_status(&db), "failed");
}

#[tokio::test]
async fn test_domain_restriction_skips_offsite_links() {
    let fetcher = MemoryFetcher::default()
        .page(
            "http://a.test/",
            r#"<body>foo <a href="http://other.org/x">x</a><a href="http://docs.a.test/y">y</a></body>"#,
        )
        .page("http://docs.a.test/y", "<body>foo</body>")
        .page("http://other.org/x", "<body>foo</body>");

    let mut crawl = settings(&["http://a.test/"], 1, &["foo"]);
    crawl.allowed_domain = Some("a.test".to_string());
    let mut coordinator = Coordinator::new(
        crawl,
        Arc::new(fetcher),
        Arc::new(Exporter::new(vec![], 200)),
    )
    .expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(coordinator.outcome("http://other.org/x"), None);
    assert_eq!(
        coordinator.outcome("http://docs.a.test/y"),
        Some(EntryState::VisitedMatched)
    );
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><title>Home</title></head><body>
                    <p>Crawlers love keywords.</p>
                    <a href="/page1">Page 1</a>
                    <a href="/private/secret">Secret</a>
                    <a href="/report.pdf">Report</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>More keywords here.</p></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let crawler = CrawlerConfig {
        max_depth: 1,
        max_concurrency: 2,
        max_pages: None,
        max_duration_secs: None,
        request_delay_ms: 10,
        request_timeout_secs: 5,
        filter_mode: FilterMode::Filter,
        respect_robots: true,
    };
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    let seed = format!("{}/", base_url);

    let fetcher = HttpFetcher::new(&user_agent, &crawler).expect("Failed to build fetcher");
    let mut crawl = settings(&[seed.as_str()], 1, &["keywords"]);
    crawl.max_concurrency = 2;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let exporter = file_exporter(&dir, vec![OutputFormat::Json]);
    let mut coordinator =
        Coordinator::new(crawl, Arc::new(fetcher), exporter).expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");

    // the pdf link is never admitted; the private page is blocked by robots.txt
    assert_eq!(report.stats.pages_dispatched, 3);
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(report.stats.pages_exported, 2);
    assert_eq!(report.stats.errors, 1);
    assert_eq!(
        coordinator.outcome(&format!("{}/private/secret", base_url)),
        Some(EntryState::VisitedError)
    );

    let export = report.export.expect("export summary");
    let json = json_urls(&file_with_extension(&export.files, "json"));
    assert_eq!(
        json,
        [format!("{}/", base_url), format!("{}/page1", base_url)]
            .into_iter()
            .collect::<BTreeSet<_>>()
    );
}
