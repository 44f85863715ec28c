//! Mutable state of a single crawl, owned by the coordinator loop

use crate::crawler::Frontier;
use crate::state::EntryState;
use crate::url::normalize_url;
use crate::SiftError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

/// Running counters for a crawl
///
/// Updated by the coordinator and readable from any thread without locking.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_dispatched: AtomicU64,
    pages_fetched: AtomicU64,
    pages_matched: AtomicU64,
    pages_exported: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pages_dispatched: u64,
    pub pages_fetched: u64,
    pub pages_matched: u64,
    pub pages_exported: u64,
    pub errors: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatched(&self) {
        self.pages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_matched(&self) {
        self.pages_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exported(&self) {
        self.pages_exported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_dispatched(&self) -> u64 {
        self.pages_dispatched.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_dispatched: self.pages_dispatched.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_matched: self.pages_matched.load(Ordering::Relaxed),
            pages_exported: self.pages_exported.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Frontier, in-flight count, counters and per-URL outcomes for one crawl
#[derive(Debug)]
pub struct CrawlState {
    pub frontier: Frontier,
    pub in_flight: usize,
    pub stats: Arc<CrawlStats>,
    outcomes: HashMap<String, EntryState>,
}

impl CrawlState {
    pub fn new(frontier: Frontier) -> Self {
        Self {
            frontier,
            in_flight: 0,
            stats: Arc::new(CrawlStats::new()),
            outcomes: HashMap::new(),
        }
    }

    /// Records a newly admitted URL as pending
    pub fn track_pending(&mut self, url: &str) {
        self.outcomes.insert(url.to_string(), EntryState::Pending);
    }

    /// Offers a URL to the frontier and tracks it as pending if admitted
    pub fn admit(&mut self, url: &str, depth: u32, discovered_from: Option<&Url>) -> bool {
        let Ok(normalized) = normalize_url(url) else {
            return false;
        };
        if !self
            .frontier
            .enqueue(normalized.as_str(), depth, discovered_from)
        {
            return false;
        }
        self.track_pending(normalized.as_str());
        true
    }

    /// Moves a URL to `next`, rejecting transitions the lifecycle forbids
    pub fn transition(&mut self, url: &str, next: EntryState) -> Result<(), SiftError> {
        let current = self
            .outcomes
            .get(url)
            .copied()
            .unwrap_or(EntryState::Pending);

        if !current.can_transition_to(next) {
            return Err(SiftError::InvalidTransition {
                url: url.to_string(),
                from: current,
                to: next,
            });
        }

        self.outcomes.insert(url.to_string(), next);
        Ok(())
    }

    pub fn outcome(&self, url: &str) -> Option<EntryState> {
        self.outcomes.get(url).copied()
    }
}
