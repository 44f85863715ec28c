//! URL handling module for Sumi-Sift
//!
//! This module provides URL normalization, host extraction, allowed-domain
//! matching, and file-extension screening for the crawl frontier.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, path_extension};
pub use matcher::matches_domain;
pub use normalize::normalize_url;

use ::url::Url;

/// File extensions that are never worth fetching for keyword matching
pub const DEFAULT_DENIED_EXTENSIONS: &[&str] =
    &["pdf", "doc", "docx", "zip", "jpg", "jpeg", "png", "gif"];

/// Returns true if the URL's last path segment ends in one of `denied`
///
/// `denied` entries are compared case-insensitively and may be given with or
/// without a leading dot.
pub fn has_denied_extension(url: &Url, denied: &[String]) -> bool {
    match path_extension(url) {
        Some(ext) => denied
            .iter()
            .any(|d| d.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// Returns the built-in denied extension list as owned strings
pub fn default_denied_extensions() -> Vec<String> {
    DEFAULT_DENIED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
