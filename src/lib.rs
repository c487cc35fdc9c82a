//! Scrape job listings and rank them against a CV with an LLM.
//!
//! [`JobMatcher`] ties the pipeline together: the listing scraper walks the
//! paginated search, the description fetcher pulls each ad's text, and the
//! ranking module builds the prompt and recovers the model's scores.

pub mod config;
pub mod descriptions;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod job_matcher;
pub mod llm;
pub mod models;
pub mod page_data;
pub mod profile;
pub mod ranking;
pub mod scraper;
pub mod traits;

pub use config::Config;
pub use error::MatchError;
pub use job_matcher::JobMatcher;
