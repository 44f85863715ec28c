//! Fetching pages over the network
//!
//! The coordinator only sees the [`Fetcher`] trait; [`HttpFetcher`] is the
//! production implementation. Tests substitute in-memory fetchers.

mod http;

pub use http::{build_http_client, HttpFetcher};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL after following redirects
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Failure category for a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Dns,
    /// Non-success HTTP status
    HttpError(u16),
    RobotsDisallowed,
    Connection,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Dns => write!(f, "dns failure"),
            Self::HttpError(status) => write!(f, "http {}", status),
            Self::RobotsDisallowed => write!(f, "disallowed by robots.txt"),
            Self::Connection => write!(f, "connection failure"),
        }
    }
}

/// A per-URL fetch failure; recoverable at the crawl level
#[derive(Debug, Clone, Error)]
#[error("{kind} fetching {url}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, url: &Url, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Retrieves the raw content of a URL
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}
