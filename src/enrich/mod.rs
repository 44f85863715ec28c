//! Optional AI enrichment of exported pages
//!
//! An [`Annotator`] adds a summary, sentiment, topics and similar fields to a
//! page before it is exported. Annotation failures never stop the crawl.

mod chat;

pub use chat::ChatAnnotator;

use crate::crawler::PageRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured analysis attached to an exported record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Annotation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Annotation service returned status {0}")]
    Status(u16),

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Could not parse annotation reply: {0}")]
    MalformedReply(String),
}

#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, record: &PageRecord) -> Result<AnnotationResult, AnnotationError>;
}
