//! reqwest-backed fetcher
//!
//! Handles:
//! - Identifying user agent strings
//! - robots.txt checks per origin, cached for a day
//! - Minimum spacing between requests to the same host
//! - Redirects (at most 10 hops)
//! - Error classification

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use crate::fetch::{FetchError, FetchErrorKind, FetchResponse, Fetcher};
use crate::robots::{fetch_robots, robots_origin, RobotsCache, RobotsRules};
use crate::state::HostState;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::error::Error as _;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with the crawler's identity and timeouts
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_sift::config::UserAgentConfig;
/// use sumi_sift::fetch::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiSift".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Production [`Fetcher`] over reqwest
pub struct HttpFetcher {
    client: Client,
    /// Product token matched against robots.txt user-agent groups
    robots_agent: String,
    request_delay: Duration,
    respect_robots: bool,
    robots: Mutex<RobotsCache>,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl HttpFetcher {
    pub fn new(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(crawler.request_timeout_secs),
        )?;

        Ok(Self {
            client,
            robots_agent: user_agent.crawler_name.clone(),
            request_delay: Duration::from_millis(crawler.request_delay_ms),
            respect_robots: crawler.respect_robots,
            robots: Mutex::new(RobotsCache::new()),
            hosts: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.user_agent, &config.crawler)
    }

    /// Returns robots rules for the URL's origin, fetching them on a cache miss
    async fn robots_for(&self, url: &Url, origin: &str) -> RobotsRules {
        if let Some(rules) = self.robots.lock().await.get(origin) {
            return rules.clone();
        }

        let rules = fetch_robots(&self.client, url).await;
        let delay = rules.crawl_delay(&self.robots_agent);
        if let Some(delay) = delay {
            debug!("{} asks for a crawl delay of {:?}", origin, delay);
        }

        self.hosts
            .lock()
            .await
            .entry(origin.to_string())
            .or_insert_with(HostState::new)
            .crawl_delay = delay;
        self.robots
            .lock()
            .await
            .insert(origin.to_string(), rules.clone());
        rules
    }

    /// Waits until the host may receive another request, then reserves the slot
    async fn throttle(&self, origin: &str) {
        loop {
            let wait = {
                let mut hosts = self.hosts.lock().await;
                let state = hosts
                    .entry(origin.to_string())
                    .or_insert_with(HostState::new);
                let now = Instant::now();
                match state.time_until_next_request(self.request_delay, now) {
                    Some(wait) => wait,
                    None => {
                        state.record_request(now);
                        return;
                    }
                }
            };
            trace!("Waiting {:?} before next request to {}", wait, origin);
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let origin = robots_origin(url).ok_or_else(|| {
            FetchError::new(FetchErrorKind::Connection, url, "URL has no host")
        })?;

        if self.respect_robots {
            let rules = self.robots_for(url, &origin).await;
            if !rules.is_allowed(url.as_str(), &self.robots_agent) {
                return Err(FetchError::new(
                    FetchErrorKind::RobotsDisallowed,
                    url,
                    "path disallowed for this crawler",
                ));
            }
        }

        self.throttle(&origin).await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FetchErrorKind::HttpError(status.as_u16()),
                url,
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let final_url = response.url().clone();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let content_type = headers.get("content-type").cloned();

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, &e))?
            .to_vec();

        Ok(FetchResponse {
            final_url,
            status_code: status.as_u16(),
            content_type,
            headers,
            body,
        })
    }
}

/// Maps a reqwest failure to a fetch error kind
fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    let kind = if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if is_dns_failure(error) {
        FetchErrorKind::Dns
    } else {
        FetchErrorKind::Connection
    };
    FetchError::new(kind, url, error.to_string())
}

fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(inner) = source {
        let message = inner.to_string().to_lowercase();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}
