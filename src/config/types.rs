use serde::Deserialize;

/// Main configuration structure for Sumi-Sift
///
/// Unknown keys anywhere in the file are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub scope: ScopeConfig,
    pub keywords: KeywordConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Keyword filtering policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Pages with no keyword match are dropped before export
    #[default]
    Filter,
    /// Matches are recorded but every page is exported
    Passthrough,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Passthrough => "passthrough",
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from a seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Stop dispatching after this many pages
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u64>,

    /// Stop dispatching after this many seconds of wall-clock time
    #[serde(rename = "max-duration-secs", default)]
    pub max_duration_secs: Option<u64>,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "filter-mode", default)]
    pub filter_mode: FilterMode,

    /// Whether robots.txt rules are honored
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

/// Which URLs the crawl starts from and may reach
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    pub seeds: Vec<String>,

    /// Domain restriction (e.g., "example.com" or "*.example.com")
    #[serde(rename = "allowed-domain", default)]
    pub allowed_domain: Option<String>,

    #[serde(rename = "include-subdomains", default = "default_true")]
    pub include_subdomains: bool,

    /// File extensions never enqueued; the built-in list applies when absent
    #[serde(rename = "denied-extensions", default)]
    pub denied_extensions: Option<Vec<String>>,
}

/// Keywords to search for
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    pub terms: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Export sink formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Sqlite,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Sqlite => "db",
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives the timestamped result files
    #[serde(default = "default_output_directory")]
    pub directory: String,

    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,

    /// Characters of cleaned text kept in the tabular preview column
    #[serde(rename = "content-preview-length", default = "default_preview_length")]
    pub content_preview_length: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            formats: default_formats(),
            content_preview_length: default_preview_length(),
        }
    }
}

/// Optional chat-completions enrichment
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_enrichment_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_enrichment_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_enrichment_endpoint(),
            model: default_enrichment_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_max_concurrency() -> u32 {
    8
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Csv, OutputFormat::Json]
}

fn default_preview_length() -> usize {
    200
}

fn default_enrichment_endpoint() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}

fn default_enrichment_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}
