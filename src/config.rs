use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listing search page; also hosts the facet catalog.
    pub listing_search_url: String,
    /// Prefix for canonical job URLs built from a posting id.
    pub job_ad_url_prefix: String,
    /// Wait after each page navigation before reading the page.
    pub settle_delay: Duration,
    pub page_timeout: Duration,
    pub description_concurrency: usize,
    pub description_timeout: Duration,
    pub max_jobs: usize,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub llm_max_tokens: u32,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_search_url: "https://www.finn.no/job/search".to_string(),
            job_ad_url_prefix: "https://www.finn.no/job/ad/".to_string(),
            settle_delay: Duration::from_millis(3000),
            page_timeout: Duration::from_secs(30),
            description_concurrency: 8,
            description_timeout: Duration::from_secs(10),
            max_jobs: 150,
            anthropic_api_key: None,
            anthropic_model: "claude-sonnet-4-5".to_string(),
            llm_max_tokens: 16_000,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            listing_search_url: env_or("LISTING_SEARCH_URL", defaults.listing_search_url),
            job_ad_url_prefix: env_or("JOB_AD_URL_PREFIX", defaults.job_ad_url_prefix),
            settle_delay: Duration::from_millis(parse_env("SETTLE_DELAY_MS", 3000)?),
            page_timeout: Duration::from_secs(parse_env("PAGE_TIMEOUT_SECS", 30)?),
            description_concurrency: parse_env(
                "DESCRIPTION_CONCURRENCY",
                defaults.description_concurrency,
            )?,
            description_timeout: Duration::from_secs(parse_env("DESCRIPTION_TIMEOUT_SECS", 10)?),
            max_jobs: parse_env("MAX_JOBS", defaults.max_jobs)?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            anthropic_model: env_or("ANTHROPIC_MODEL", defaults.anthropic_model),
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            rust_log: env_or("RUST_LOG", defaults.rust_log),
        })
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
