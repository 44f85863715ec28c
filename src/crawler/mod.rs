//! Crawl engine
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first frontier and its admission policy
//! - HTML text and link extraction
//! - The coordinator that drives fetches through the page pipeline

mod coordinator;
mod extractor;
mod frontier;

pub use coordinator::{Coordinator, CrawlReport, CrawlSettings, StopHandle, StopReason};
pub use extractor::{clean_text, extract, ExtractionError, PageRecord};
pub use frontier::{Frontier, FrontierEntry, FrontierPolicy};
