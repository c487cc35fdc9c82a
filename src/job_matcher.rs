use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::descriptions::DescriptionFetcher;
use crate::error::MatchError;
use crate::filters::FilterCatalogCache;
use crate::llm::LlmClient;
use crate::models::{AnalysisResult, FilterCatalog, JobRecord, SearchParams};
use crate::profile::ProfileStore;
use crate::ranking::{build_prompt, merge_ranked, parse_ranked};
use crate::scraper::ListingScraper;
use crate::traits::PageFetcher;

/// Owns the pipeline's collaborators and long-lived state: the facet catalog
/// cache (filled once) and the profile store (replaced on upload).
///
/// Cloning shares both.
#[derive(Clone)]
pub struct JobMatcher {
    fetcher: Arc<dyn PageFetcher>,
    scraper: ListingScraper,
    descriptions: DescriptionFetcher,
    llm: Arc<dyn LlmClient>,
    profile: ProfileStore,
    filters: Arc<FilterCatalogCache>,
    listing_search_url: String,
    max_jobs: usize,
    llm_max_tokens: u32,
}

impl JobMatcher {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn PageFetcher>,
        descriptions: DescriptionFetcher,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let scraper = ListingScraper::new(
            fetcher.clone(),
            config.listing_search_url.clone(),
            config.job_ad_url_prefix.clone(),
        );

        Self {
            fetcher,
            scraper,
            descriptions,
            llm,
            profile: ProfileStore::new(),
            filters: Arc::new(FilterCatalogCache::new()),
            listing_search_url: config.listing_search_url.clone(),
            max_jobs: config.max_jobs,
            llm_max_tokens: config.llm_max_tokens,
        }
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    /// The facet catalog, loaded on first use and cached afterwards.
    pub async fn get_filter_catalog(&self) -> Result<FilterCatalog, MatchError> {
        self.filters
            .get_or_load(self.fetcher.as_ref(), &self.listing_search_url)
            .await
            .cloned()
    }

    pub async fn scrape_listing(&self, params: &SearchParams) -> Result<Vec<JobRecord>, MatchError> {
        self.scraper.scrape_listing(params).await
    }

    /// Rank `jobs` against the current profile.
    ///
    /// The profile is read once at the start; uploads made while the analysis
    /// runs are not seen by it.
    pub async fn analyze(&self, jobs: &[JobRecord]) -> Result<Vec<AnalysisResult>, MatchError> {
        let profile = self.profile.snapshot().await;
        let cv = profile.cv().ok_or(MatchError::NoProfile)?;

        if jobs.is_empty() {
            return Err(MatchError::EmptyBatch);
        }
        if jobs.len() > self.max_jobs {
            return Err(MatchError::TooManyJobs {
                count: jobs.len(),
                max: self.max_jobs,
            });
        }

        info!("Analyzing {} jobs", jobs.len());

        let result = self.rank(cv, profile.cover_letter(), jobs).await;
        if let Err(e) = &result {
            error!("Analysis failed: {:?}", e);
        }
        result
    }

    async fn rank(
        &self,
        cv: &str,
        cover_letter: Option<&str>,
        jobs: &[JobRecord],
    ) -> Result<Vec<AnalysisResult>, MatchError> {
        let urls: Vec<String> = jobs.iter().map(|job| job.url.clone()).collect();
        let descriptions = self.descriptions.fetch_descriptions(&urls).await;

        let prompt = build_prompt(cv, cover_letter, jobs, &descriptions);
        let reply = self.llm.complete(&prompt, self.llm_max_tokens).await?;

        let ranked = parse_ranked(&reply)?;
        let results = merge_ranked(jobs, ranked);

        info!("Ranked {} of {} jobs", results.len(), jobs.len());
        Ok(results)
    }
}
