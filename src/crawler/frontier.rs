//! Crawl frontier: the breadth-first queue of URLs still to visit
//!
//! The frontier owns every URL set the crawl keeps:
//! - `pending`: admitted and waiting in the FIFO
//! - `visited`: dispatched and finished (including redirect targets)
//! - `seen`: every URL ever admitted, so nothing is admitted twice
//!
//! `visited` and `pending` never overlap, and a URL enters `pending` at most
//! once for the life of the frontier.

use crate::url::{has_denied_extension, matches_domain, normalize_url};
use crate::SiftError;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized absolute URL
    pub url: Url,

    /// Link hops from the seed that led here (seeds are depth 0)
    pub depth: u32,

    /// The page this URL was found on, if any
    pub discovered_from: Option<Url>,
}

/// Admission rules applied by [`Frontier::enqueue`]
#[derive(Debug, Clone)]
pub struct FrontierPolicy {
    pub max_depth: u32,
    pub allowed_domain: Option<String>,
    pub include_subdomains: bool,
    pub denied_extensions: Vec<String>,
}

impl FrontierPolicy {
    /// Checks the depth, domain and extension rules for a normalized URL
    pub fn admits(&self, url: &Url, depth: u32) -> bool {
        if depth > self.max_depth {
            trace!("Rejecting {} at depth {}: beyond max depth", url, depth);
            return false;
        }

        if let Some(allowed) = &self.allowed_domain {
            let Some(host) = url.host_str() else {
                return false;
            };
            if !matches_domain(host, allowed, self.include_subdomains) {
                trace!("Rejecting {}: outside {}", url, allowed);
                return false;
            }
        }

        if has_denied_extension(url, &self.denied_extensions) {
            trace!("Rejecting {}: denied extension", url);
            return false;
        }

        true
    }
}

/// Breadth-first URL frontier
#[derive(Debug)]
pub struct Frontier {
    policy: FrontierPolicy,
    queue: VecDeque<FrontierEntry>,
    pending: HashSet<String>,
    visited: HashSet<String>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new(policy: FrontierPolicy) -> Self {
        Self {
            policy,
            queue: VecDeque::new(),
            pending: HashSet::new(),
            visited: HashSet::new(),
            seen: HashSet::new(),
        }
    }

    pub fn policy(&self) -> &FrontierPolicy {
        &self.policy
    }

    /// Offers a URL to the frontier
    ///
    /// Returns true if it was admitted. URLs that fail to normalize, were
    /// admitted before, are already visited, or break the depth/domain/extension
    /// policy are dropped without error.
    pub fn enqueue(&mut self, url: &str, depth: u32, discovered_from: Option<&Url>) -> bool {
        let normalized = match normalize_url(url) {
            Ok(u) => u,
            Err(e) => {
                trace!("Dropping unnormalizable URL {}: {}", url, e);
                return false;
            }
        };
        let key = normalized.as_str().to_string();

        if self.seen.contains(&key) || self.visited.contains(&key) || self.pending.contains(&key)
        {
            return false;
        }

        if !self.policy.admits(&normalized, depth) {
            return false;
        }

        debug!("Admitted {} at depth {}", key, depth);
        self.seen.insert(key.clone());
        self.pending.insert(key);
        self.queue.push_back(FrontierEntry {
            url: normalized,
            depth,
            discovered_from: discovered_from.cloned(),
        });
        true
    }

    /// Removes the oldest admitted entry
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.pending.remove(entry.url.as_str());
        Some(entry)
    }

    /// Records a URL as visited
    ///
    /// Returns whether the URL was newly added. Marking a URL that is still
    /// waiting in the queue is an error. A URL the frontier never admitted,
    /// such as a redirect target, may be marked and will then never be admitted.
    pub fn mark_visited(&mut self, url: &Url) -> Result<bool, SiftError> {
        let key = match normalize_url(url.as_str()) {
            Ok(u) => u.as_str().to_string(),
            Err(_) => url.as_str().to_string(),
        };

        if self.pending.contains(&key) {
            return Err(SiftError::FrontierInvariantViolation(format!(
                "{} marked visited while still pending",
                key
            )));
        }

        let newly = self.visited.insert(key.clone());
        self.seen.insert(key);
        Ok(newly)
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        normalize_url(url.as_str())
            .map(|u| self.visited.contains(u.as_str()))
            .unwrap_or(false)
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
