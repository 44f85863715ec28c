//! Robots.txt rule evaluation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate. Crawl-delay is
//! not part of the matcher, so it is read from the groups directly.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Longest Crawl-delay honored; larger values are clamped to it
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Robots.txt rules for a single host
#[derive(Debug, Clone)]
pub struct RobotsRules {
    body: String,
    allow_all: bool,
}

impl RobotsRules {
    /// Wraps a fetched robots.txt body
    pub fn from_body(body: &str) -> Self {
        Self {
            body: body.to_string(),
            allow_all: false,
        }
    }

    /// Rules that allow every path
    ///
    /// Used when robots.txt is missing, unreachable, or robots handling is off.
    pub fn allow_all() -> Self {
        Self {
            body: String::new(),
            allow_all: true,
        }
    }

    pub fn is_allow_all(&self) -> bool {
        self.allow_all || self.body.trim().is_empty()
    }

    /// Checks whether `url` may be fetched by the crawler identified by `agent`
    ///
    /// `url` may be an absolute URL or a bare path; only the path and query
    /// are considered.
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, agent, url)
    }

    /// Returns the Crawl-delay that applies to `agent`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        if self.is_allow_all() {
            return None;
        }

        let agent = agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_group_body = false;
        let mut wildcard_delay = None;
        let mut agent_delay = None;

        for line in self.body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // a user-agent line after rules starts a new group
                    if in_group_body {
                        group.clear();
                        in_group_body = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_group_body = true;
                    let Ok(secs) = value.parse::<f64>() else {
                        continue;
                    };
                    if !secs.is_finite() || secs < 0.0 {
                        continue;
                    }
                    let delay = Duration::from_secs_f64(secs.min(MAX_CRAWL_DELAY.as_secs_f64()));
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        agent_delay = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard_delay = Some(delay);
                    }
                }
                _ => in_group_body = true,
            }
        }

        agent_delay.or(wildcard_delay)
    }
}
