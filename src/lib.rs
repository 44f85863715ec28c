//! Sumi-Sift: a keyword-sifting web crawler
//!
//! This crate crawls a bounded set of pages from seed URLs, follows links
//! breadth-first up to a configured depth, keeps the pages that mention the
//! configured keywords, and exports each kept page exactly once to tabular,
//! structured-document and SQLite sinks.

pub mod config;
pub mod crawler;
pub mod enrich;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Frontier invariant violated: {0}")]
    FrontierInvariantViolation(String),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: state::EntryState,
        to: state::EntryState,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport, CrawlSettings, StopHandle, StopReason};
pub use state::{CrawlStats, EntryState, StatsSnapshot};
pub use crate::url::{extract_domain, matches_domain, normalize_url};
