//! Per-host robots.txt cache with daily expiry

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Cached robots.txt rules for one host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached rules are older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }
}

/// Robots rules keyed by origin (`scheme://host:port`)
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns fresh rules for `origin`, or None if absent or stale
    pub fn get(&self, origin: &str) -> Option<&RobotsRules> {
        self.entries
            .get(origin)
            .filter(|cached| !cached.is_stale())
            .map(|cached| &cached.rules)
    }

    pub fn insert(&mut self, origin: String, rules: RobotsRules) {
        self.entries.insert(origin, CachedRobots::new(rules));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
