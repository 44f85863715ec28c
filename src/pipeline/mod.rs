//! Per-page processing stages run by the coordinator after extraction
//!
//! Every extracted page passes keyword matching, then deduplication, then
//! export, in that order and exactly once.

mod dedup;
mod matcher;

pub use crate::config::FilterMode;
pub use dedup::Deduplicator;
pub use matcher::{KeywordMatcher, MatchResult};
