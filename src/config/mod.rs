//! Configuration module for Sumi-Sift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, EnrichmentConfig, FilterMode, KeywordConfig, OutputConfig,
    OutputFormat, ScopeConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

use crate::crawler::CrawlSettings;
use crate::url::default_denied_extensions;
use std::time::Duration;

impl Config {
    /// Derives the engine settings used by the crawl coordinator
    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            seeds: self.scope.seeds.clone(),
            max_depth: self.crawler.max_depth,
            max_concurrency: self.crawler.max_concurrency as usize,
            max_pages: self.crawler.max_pages,
            max_duration: self.crawler.max_duration_secs.map(Duration::from_secs),
            allowed_domain: self.scope.allowed_domain.clone(),
            include_subdomains: self.scope.include_subdomains,
            denied_extensions: self
                .scope
                .denied_extensions
                .clone()
                .unwrap_or_else(default_denied_extensions),
            keywords: self.keywords.terms.clone(),
            filter_mode: self.crawler.filter_mode,
        }
    }
}
