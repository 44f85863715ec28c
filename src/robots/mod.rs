//! Robots.txt handling module
//!
//! Fetches, parses and caches robots.txt per origin. A robots.txt that cannot
//! be retrieved, or that answers with a non-success status, allows everything.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::RobotsRules;

use tracing::debug;
use url::Url;

/// Returns the cache key for a URL's robots.txt (`scheme://host[:port]`)
pub fn robots_origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Returns the robots.txt location for a URL's origin
pub fn robots_url(url: &Url) -> Option<Url> {
    let origin = robots_origin(url)?;
    Url::parse(&format!("{}/robots.txt", origin)).ok()
}

/// Fetches robots.txt for the origin of `url`
///
/// Never fails: network errors and non-2xx answers yield allow-all rules.
pub async fn fetch_robots(client: &reqwest::Client, url: &Url) -> RobotsRules {
    let Some(robots_url) = robots_url(url) else {
        return RobotsRules::allow_all();
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("robots.txt unreachable at {}: {}", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsRules::from_body(&body),
        Err(e) => {
            debug!("Failed to read robots.txt body from {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
