//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator loop is the only writer of the frontier and crawl state.
//! Fetches run concurrently on a `JoinSet`; their completions are received
//! one at a time and each page is pushed through the fixed pipeline:
//! extract, keyword match, dedup, export, then enqueue children.

use crate::config::FilterMode;
use crate::crawler::extractor::extract;
use crate::crawler::frontier::{Frontier, FrontierEntry, FrontierPolicy};
use crate::fetch::{FetchError, FetchErrorKind, FetchResponse, Fetcher};
use crate::output::{ExportSummary, Exporter, OutputError, RunStatus};
use crate::pipeline::{Deduplicator, KeywordMatcher};
use crate::state::{CrawlState, CrawlStats, EntryState, StatsSnapshot};
use crate::url::normalize_url;
use crate::{ConfigError, SiftError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// How often (in completed pages) progress is logged
const PROGRESS_INTERVAL: u64 = 10;

/// Engine settings for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub seeds: Vec<String>,
    pub max_depth: u32,
    pub max_concurrency: usize,
    /// Stop dispatching after this many fetches
    pub max_pages: Option<u64>,
    /// Stop dispatching after this much wall-clock time
    pub max_duration: Option<Duration>,
    pub allowed_domain: Option<String>,
    pub include_subdomains: bool,
    pub denied_extensions: Vec<String>,
    pub keywords: Vec<String>,
    pub filter_mode: FilterMode,
}

impl CrawlSettings {
    pub fn frontier_policy(&self) -> FrontierPolicy {
        FrontierPolicy {
            max_depth: self.max_depth,
            allowed_domain: self.allowed_domain.clone(),
            include_subdomains: self.include_subdomains,
            denied_extensions: self.denied_extensions.clone(),
        }
    }
}

/// Cooperative cancellation for a running crawl
///
/// Cloning shares the same flag. Once requested, no new fetches are
/// dispatched; in-flight fetches still drain through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the crawl stopped dispatching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FrontierExhausted,
    PageLimit,
    TimeLimit,
    Cancelled,
    ExportFailed,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier exhausted",
            Self::PageLimit => "page limit reached",
            Self::TimeLimit => "time limit reached",
            Self::Cancelled => "cancelled",
            Self::ExportFailed => "export failed",
        }
    }

    fn run_status(&self) -> RunStatus {
        match self {
            Self::FrontierExhausted | Self::PageLimit | Self::TimeLimit => RunStatus::Completed,
            Self::Cancelled => RunStatus::Interrupted,
            Self::ExportFailed => RunStatus::Failed,
        }
    }
}

/// Final result of a crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub stats: StatsSnapshot,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
    pub export: Option<ExportSummary>,
}

/// What a fetch task hands back to the loop
struct FetchOutcome {
    entry: FrontierEntry,
    result: Result<FetchResponse, FetchError>,
    fetch_time: Duration,
    fetched_at: DateTime<Utc>,
}

/// Main crawler coordinator structure
pub struct Coordinator<F: Fetcher> {
    settings: CrawlSettings,
    fetcher: Arc<F>,
    exporter: Arc<Exporter>,
    state: CrawlState,
    matcher: KeywordMatcher,
    dedup: Deduplicator,
    stop: StopHandle,
    stop_reason: Option<StopReason>,
    completed: u64,
}

impl<F: Fetcher> Coordinator<F> {
    /// Creates a coordinator and seeds the frontier at depth 0
    ///
    /// Seeds rejected by the frontier policy are logged and skipped. Fails
    /// with a configuration error if no seed is admitted.
    pub fn new(
        settings: CrawlSettings,
        fetcher: Arc<F>,
        exporter: Arc<Exporter>,
    ) -> Result<Self, SiftError> {
        let mut state = CrawlState::new(Frontier::new(settings.frontier_policy()));

        for seed in &settings.seeds {
            if state.admit(seed, 0, None) {
                tracing::info!("Seeded {}", seed);
            } else {
                tracing::warn!("Seed {} rejected by crawl scope", seed);
            }
        }

        if state.frontier.is_empty() {
            return Err(SiftError::Config(ConfigError::Validation(
                "no seed URL was admitted to the frontier".to_string(),
            )));
        }

        let matcher = KeywordMatcher::new(&settings.keywords, settings.filter_mode);

        Ok(Self {
            settings,
            fetcher,
            exporter,
            state,
            matcher,
            dedup: Deduplicator::new(),
            stop: StopHandle::new(),
            stop_reason: None,
            completed: 0,
        })
    }

    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.state.stats)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Lifecycle state of a URL, looked up by its normalized form
    pub fn outcome(&self, url: &str) -> Option<EntryState> {
        match normalize_url(url) {
            Ok(normalized) => self.state.outcome(normalized.as_str()),
            Err(_) => self.state.outcome(url),
        }
    }

    /// Runs the crawl to completion
    ///
    /// The exporter is finalized exactly once before returning. If a sink
    /// write fails, dispatch stops, in-flight pages drain, and the write
    /// error is returned.
    pub async fn run(&mut self) -> Result<CrawlReport, SiftError> {
        let started = Instant::now();
        let deadline = self
            .settings
            .max_duration
            .map(|d| tokio::time::Instant::now() + d);
        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
        let mut export_error: Option<OutputError> = None;
        let mut fatal: Option<SiftError> = None;

        tracing::info!(
            "Starting crawl: {} seed(s), max depth {}, concurrency {}",
            self.state.frontier.pending_len(),
            self.settings.max_depth,
            self.settings.max_concurrency
        );

        loop {
            if self.stop_reason.is_none() {
                if let Err(e) = self.dispatch(&mut tasks) {
                    fatal = Some(e);
                    break;
                }
            }

            let next = match deadline {
                Some(deadline) if self.stop_reason.is_none() => {
                    tokio::select! {
                        next = tasks.join_next() => next,
                        _ = tokio::time::sleep_until(deadline) => {
                            self.stop_with(StopReason::TimeLimit);
                            continue;
                        }
                    }
                }
                _ => tasks.join_next().await,
            };

            let Some(joined) = next else {
                // nothing in flight and nothing dispatched
                break;
            };
            self.state.in_flight = self.state.in_flight.saturating_sub(1);

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Fetch task failed: {}", e);
                    self.state.stats.record_error();
                    continue;
                }
            };

            match self.process_record(outcome).await {
                Ok(()) => {}
                Err(SiftError::Output(e)) => {
                    tracing::error!("Export failed, stopping crawl: {}", e);
                    self.stop_with(StopReason::ExportFailed);
                    export_error.get_or_insert(e);
                }
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }

        if fatal.is_some() {
            tasks.shutdown().await;
            self.state.in_flight = 0;
        }

        let stop_reason = self.stop_reason.unwrap_or(StopReason::FrontierExhausted);
        let run_status = if fatal.is_some() {
            RunStatus::Failed
        } else {
            stop_reason.run_status()
        };
        let finalized = self.exporter.finalize_as(run_status).await;

        let stats = self.state.stats.snapshot();
        tracing::info!(
            "Crawl finished ({}): {} fetched, {} matched, {} exported, {} errors in {:.1?}",
            stop_reason.as_str(),
            stats.pages_fetched,
            stats.pages_matched,
            stats.pages_exported,
            stats.errors,
            started.elapsed()
        );

        if let Some(e) = fatal {
            return Err(e);
        }
        if let Some(e) = export_error {
            return Err(e.into());
        }
        let export = finalized?;

        Ok(CrawlReport {
            stats,
            stop_reason,
            elapsed: started.elapsed(),
            export: Some(export),
        })
    }

    fn stop_with(&mut self, reason: StopReason) {
        if self.stop_reason.is_none() {
            tracing::info!("Stopping dispatch: {}", reason.as_str());
            self.stop_reason = Some(reason);
        }
    }

    /// Spawns fetches until the concurrency bound, a stop condition, or an
    /// empty frontier
    fn dispatch(&mut self, tasks: &mut JoinSet<FetchOutcome>) -> Result<(), SiftError> {
        while self.state.in_flight < self.settings.max_concurrency {
            if self.stop.is_stopped() {
                self.stop_with(StopReason::Cancelled);
                return Ok(());
            }
            if self.state.frontier.is_empty() {
                return Ok(());
            }
            if let Some(max_pages) = self.settings.max_pages {
                if self.state.stats.pages_dispatched() >= max_pages {
                    self.stop_with(StopReason::PageLimit);
                    return Ok(());
                }
            }

            let Some(entry) = self.state.frontier.dequeue() else {
                return Ok(());
            };
            self.state
                .transition(entry.url.as_str(), EntryState::InFlight)?;
            self.state.stats.record_dispatched();
            self.state.in_flight += 1;

            tracing::debug!("Dispatching {} (depth {})", entry.url, entry.depth);
            let fetcher = Arc::clone(&self.fetcher);
            tasks.spawn(async move {
                let started = Instant::now();
                let url = entry.url.clone();
                // a panicking fetch still has to settle its entry
                let result = match tokio::spawn(async move { fetcher.fetch(&url).await }).await {
                    Ok(result) => result,
                    Err(e) => Err(FetchError::new(
                        FetchErrorKind::Connection,
                        &entry.url,
                        format!("fetch task failed: {}", e),
                    )),
                };
                FetchOutcome {
                    entry,
                    result,
                    fetch_time: started.elapsed(),
                    fetched_at: Utc::now(),
                }
            });
        }
        Ok(())
    }

    /// Runs one completed fetch through the pipeline
    async fn process_record(&mut self, outcome: FetchOutcome) -> Result<(), SiftError> {
        let FetchOutcome {
            entry,
            result,
            fetch_time,
            fetched_at,
        } = outcome;
        let key = entry.url.as_str().to_string();

        self.state.frontier.mark_visited(&entry.url)?;
        self.completed += 1;
        if self.completed % PROGRESS_INTERVAL == 0 {
            let stats = self.state.stats.snapshot();
            tracing::info!(
                "Progress: {} pages done, {} pending, {} in flight, {} exported",
                self.completed,
                self.state.frontier.pending_len(),
                self.state.in_flight,
                stats.pages_exported
            );
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{}", e);
                self.state.stats.record_error();
                self.state.transition(&key, EntryState::VisitedError)?;
                return Ok(());
            }
        };

        if response.final_url != entry.url {
            let target = normalize_url(response.final_url.as_str())
                .ok()
                .filter(|target| self.state.frontier.policy().admits(target, entry.depth));
            let Some(target) = target else {
                tracing::warn!(
                    "{} redirected out of scope to {}",
                    entry.url,
                    response.final_url
                );
                self.state.stats.record_error();
                self.state.transition(&key, EntryState::VisitedError)?;
                return Ok(());
            };
            if let Err(e) = self.state.frontier.mark_visited(&target) {
                tracing::debug!("Redirect target not marked: {}", e);
            }
        }
        self.state.stats.record_fetched();

        let record = match extract(
            &response.body,
            response.content_type.as_deref(),
            &response.final_url,
            entry.depth,
            fetch_time,
            fetched_at,
        ) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to extract {}: {}", entry.url, e);
                self.state.stats.record_error();
                self.state.transition(&key, EntryState::VisitedError)?;
                return Ok(());
            }
        };

        let result = self.matcher.evaluate(record);
        if result.matches {
            self.state.stats.record_matched();
        }
        let visited = if result.matches {
            EntryState::VisitedMatched
        } else {
            EntryState::VisitedUnmatched
        };
        self.state.transition(&key, visited)?;

        let emit_key = normalize_url(result.record.url.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| result.record.url.to_string());
        if result.retained && self.dedup.should_emit(&emit_key) {
            self.exporter.export(&result).await?;
            self.state.stats.record_exported();
            tracing::debug!(
                "Exported {} (keywords: {:?})",
                result.record.url,
                result.matched_keywords
            );
        }

        if entry.depth < self.settings.max_depth {
            let mut admitted = 0usize;
            for link in &result.record.outbound_links {
                if self
                    .state
                    .admit(link.as_str(), entry.depth + 1, Some(&result.record.url))
                {
                    admitted += 1;
                }
            }
            tracing::debug!(
                "{}: {} links, {} admitted",
                entry.url,
                result.record.outbound_links.len(),
                admitted
            );
        }

        Ok(())
    }
}
