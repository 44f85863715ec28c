use crate::config::EnrichmentConfig;
use crate::crawler::PageRecord;
use crate::enrich::{AnnotationError, AnnotationResult, Annotator};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Characters of page text sent for analysis
const MAX_CONTENT_CHARS: usize = 3000;

const SYSTEM_PROMPT: &str =
    "You are an expert content analyzer. Provide structured analysis of web content.";

/// Annotator backed by an OpenAI-compatible chat-completions endpoint
pub struct ChatAnnotator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// The JSON object the model is asked to produce
#[derive(Debug, Default, Serialize, Deserialize)]
struct Analysis {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

impl ChatAnnotator {
    pub fn new(endpoint: String, model: String, api_key: String) -> Result<Self, AnnotationError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Builds an annotator from config, reading the key from the environment
    ///
    /// Returns `MissingApiKey` when the configured variable is unset or empty.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, AnnotationError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnnotationError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config.endpoint.clone(), config.model.clone(), api_key)
    }

    fn build_prompt(record: &PageRecord) -> String {
        let content: String = if record.cleaned_text.chars().count() > MAX_CONTENT_CHARS {
            let mut truncated: String = record.cleaned_text.chars().take(MAX_CONTENT_CHARS).collect();
            truncated.push_str("...");
            truncated
        } else {
            record.cleaned_text.clone()
        };

        format!(
            "Analyze the following web content and reply with a single JSON object.\n\n\
             URL: {}\nTitle: {}\n\nContent:\n{}\n\n\
             Use this structure:\n\
             {{\"summary\": \"2-3 sentence summary\", \
             \"sentiment\": \"positive/neutral/negative\", \
             \"topics\": [\"...\"], \"entities\": [\"...\"], \
             \"key_points\": [\"...\"], \"keywords\": [\"...\"]}}\n\n\
             Only include information clearly present in the content.",
            record.url, record.title, content
        )
    }
}

/// Pulls the outermost `{...}` span out of a model reply and parses it
fn parse_reply(text: &str) -> Result<AnnotationResult, AnnotationError> {
    let start = text
        .find('{')
        .ok_or_else(|| AnnotationError::MalformedReply("no JSON object in reply".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| AnnotationError::MalformedReply("unterminated JSON object".to_string()))?;

    let analysis: Analysis = serde_json::from_str(&text[start..=end])
        .map_err(|e| AnnotationError::MalformedReply(e.to_string()))?;

    Ok(AnnotationResult {
        summary: analysis.summary,
        sentiment: analysis.sentiment.map(|s| s.to_lowercase()),
        topics: analysis.topics,
        entities: analysis.entities,
        key_points: analysis.key_points,
        keywords: analysis.keywords,
        analyzed_at: Some(Utc::now()),
    })
}

#[async_trait]
impl Annotator for ChatAnnotator {
    async fn annotate(&self, record: &PageRecord) -> Result<AnnotationResult, AnnotationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::build_prompt(record)},
            ],
            "temperature": 0.3,
            "max_tokens": 1000,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnnotationError::Status(status.as_u16()));
        }

        let reply: ChatReply = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnnotationError::MalformedReply("empty choices".to_string()))?;

        debug!("Annotated {} ({} reply chars)", record.url, content.len());
        parse_reply(&content)
    }
}
