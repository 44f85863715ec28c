use crate::config::types::{
    Config, CrawlerConfig, EnrichmentConfig, FilterMode, KeywordConfig, OutputConfig, ScopeConfig,
    UserAgentConfig,
};
use crate::url::matches_domain;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_scope_config(&config.scope)?;
    validate_keywords(&config.keywords, config.crawler.filter_mode)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_enrichment_config(&config.enrichment)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 256, got {}",
            config.max_concurrency
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_duration_secs == Some(0) {
        return Err(ConfigError::Validation(
            "max-duration-secs must be >= 1 when set".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "scope.seeds must contain at least one URL".to_string(),
        ));
    }

    let mut hosts = Vec::with_capacity(config.seeds.len());
    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use the http or https scheme",
                seed
            )));
        }
        if let Some(host) = url.host_str() {
            hosts.push(host.to_string());
        }
    }

    if let Some(domain) = &config.allowed_domain {
        validate_domain_pattern(domain)?;

        if !hosts
            .iter()
            .any(|host| matches_domain(host, domain, config.include_subdomains))
        {
            return Err(ConfigError::Validation(format!(
                "No seed URL lies inside scope.allowed-domain '{}'",
                domain
            )));
        }
    }

    Ok(())
}

fn validate_keywords(config: &KeywordConfig, mode: FilterMode) -> Result<(), ConfigError> {
    if config.terms.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "keywords.terms cannot contain empty strings".to_string(),
        ));
    }

    if mode == FilterMode::Filter && config.terms.is_empty() {
        return Err(ConfigError::Validation(
            "keywords.terms must not be empty in filter mode".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output.directory cannot be empty".to_string(),
        ));
    }

    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "output.formats must name at least one format".to_string(),
        ));
    }

    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid enrichment endpoint: {}", e)))?;

    if config.model.is_empty() {
        return Err(ConfigError::Validation(
            "enrichment.model cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
