//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: lifecycle of a single frontier entry
//! - `CrawlState` / `CrawlStats`: the coordinator's frontier, counters and outcomes
//! - `HostState`: per-host politeness timing used by the HTTP fetcher

mod crawl_state;
mod entry_state;
mod host_state;

pub use crawl_state::{CrawlState, CrawlStats, StatsSnapshot};
pub use entry_state::EntryState;
pub use host_state::HostState;
