use crate::config::FilterMode;
use crate::crawler::PageRecord;

/// Outcome of keyword evaluation for one page
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub record: PageRecord,
    /// Matched keywords in configuration order, without duplicates
    pub matched_keywords: Vec<String>,
    pub matches: bool,
    /// False only when filtering and nothing matched
    pub retained: bool,
}

/// Case-insensitive substring matcher over a page's title and body text
///
/// Holds no mutable state, so one instance can be shared freely.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    mode: FilterMode,
}

impl KeywordMatcher {
    /// Keywords are trimmed, lowercased and deduplicated; blanks are dropped
    pub fn new<S: AsRef<str>>(keywords: &[S], mode: FilterMode) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let k = keyword.as_ref().trim().to_lowercase();
            if !k.is_empty() && !normalized.contains(&k) {
                normalized.push(k);
            }
        }

        Self {
            keywords: normalized,
            mode,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Evaluates a record
    ///
    /// With no keywords configured every page matches.
    pub fn evaluate(&self, record: PageRecord) -> MatchResult {
        let haystack = format!("{} {}", record.title, record.cleaned_text).to_lowercase();

        let matched_keywords: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .cloned()
            .collect();

        let matches = self.keywords.is_empty() || !matched_keywords.is_empty();
        let retained = matches || self.mode == FilterMode::Passthrough;

        MatchResult {
            record,
            matched_keywords,
            matches,
            retained,
        }
    }
}
