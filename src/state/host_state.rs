use std::time::{Duration, Instant};

/// Politeness bookkeeping for one host
///
/// The fetcher consults this before every request so that consecutive
/// requests to the same host are spaced by at least the effective delay.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests issued to this host
    pub request_count: u32,

    /// When the last request to this host was issued
    pub last_request_time: Option<Instant>,

    /// Crawl-delay advertised by the host's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The larger of the configured delay and the robots.txt Crawl-delay
    pub fn effective_delay(&self, configured: Duration) -> Duration {
        match self.crawl_delay {
            Some(robots) => configured.max(robots),
            None => configured,
        }
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now.
    pub fn time_until_next_request(&self, configured: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let delay = self.effective_delay(configured);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }

    pub fn can_request(&self, configured: Duration, now: Instant) -> bool {
        self.time_until_next_request(configured, now).is_none()
    }

    /// Records that a request was issued at `at`
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }
}
