//! Error taxonomy for the scrape-and-rank pipeline

use thiserror::Error;

/// The embedded page payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("page contains no script elements")]
    NoScripts,

    #[error("embedded payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("embedded payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM client is not configured: {0}")]
    NotConfigured(String),
}

/// Failures of the exposed operations.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("failed to decode page data: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to extract filter catalog: {0}")]
    FilterExtraction(String),

    #[error("unexpected listing page structure: {0}")]
    PageParse(String),

    #[error("Too many jobs ({count}). Narrow the search to at most {max} jobs.")]
    TooManyJobs { count: usize, max: usize },

    #[error("No CV uploaded")]
    NoProfile,

    #[error("No jobs to analyze")]
    EmptyBatch,

    #[error("No JSON array found in response. The model said: {preview}")]
    RankingParse { preview: String },

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("page fetch failed: {0}")]
    Fetch(#[from] anyhow::Error),
}

impl MatchError {
    /// Rejections caused by the caller's input rather than an internal failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TooManyJobs { .. } | Self::NoProfile | Self::EmptyBatch
        )
    }
}
