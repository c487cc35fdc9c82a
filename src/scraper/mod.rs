use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::MatchError;
use crate::models::{JobRecord, SearchParams};
use crate::page_data::decode_page_data;
use crate::traits::{PageFetcher, PageSession};

const SEARCH_STATE_POINTER: &str = "/queries/0/state/data";

/// Walks the paginated listing search and collects every job posting.
#[derive(Clone)]
pub struct ListingScraper {
    fetcher: Arc<dyn PageFetcher>,
    search_url: String,
    ad_url_prefix: String,
}

impl ListingScraper {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        search_url: impl Into<String>,
        ad_url_prefix: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            search_url: search_url.into(),
            ad_url_prefix: ad_url_prefix.into(),
        }
    }

    /// Fetch page 1, learn the page count, then fetch the remaining pages in
    /// order through the same session. Any page failure fails the scrape.
    pub async fn scrape_listing(&self, params: &SearchParams) -> Result<Vec<JobRecord>, MatchError> {
        let base_url = build_search_url(&self.search_url, params);
        info!("Scraping job listing: {}", base_url);

        let mut session = self.fetcher.open_session().await?;
        let result = self.scrape_pages(session.as_mut(), &base_url).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close page session: {}", e);
        }

        let jobs = result?;
        info!("Found {} jobs", jobs.len());
        Ok(jobs)
    }

    async fn scrape_pages(
        &self,
        session: &mut dyn PageSession,
        base_url: &str,
    ) -> Result<Vec<JobRecord>, MatchError> {
        let (mut all_jobs, last_page) = self.scrape_page(session, base_url).await?;
        info!("Listing has {} pages", last_page);

        let separator = if base_url.contains('?') { '&' } else { '?' };

        for page_num in 2..=last_page {
            let page_url = format!("{base_url}{separator}page={page_num}");
            let (page_jobs, _) = self.scrape_page(session, &page_url).await?;
            info!("Page {}: {} jobs", page_num, page_jobs.len());
            all_jobs.extend(page_jobs);
        }

        Ok(all_jobs)
    }

    async fn scrape_page(
        &self,
        session: &mut dyn PageSession,
        url: &str,
    ) -> Result<(Vec<JobRecord>, u64), MatchError> {
        let page = session.fetch(url).await?;
        let document = decode_page_data(&page)?;
        extract_jobs_from_page(&document, &self.ad_url_prefix)
    }
}

/// Append the URL-encoded parameters to the search URL. Array values repeat
/// the key rather than being comma-joined.
pub fn build_search_url(search_url: &str, params: &SearchParams) -> String {
    let query = params
        .iter()
        .flat_map(|(key, value)| {
            value.values().iter().map(move |v| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(v))
            })
        })
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        search_url.to_string()
    } else {
        format!("{search_url}?{query}")
    }
}

/// Extract the job postings of one decoded listing page together with the
/// number of the last page.
pub fn extract_jobs_from_page(
    document: &Value,
    ad_url_prefix: &str,
) -> Result<(Vec<JobRecord>, u64), MatchError> {
    let state = document
        .pointer(SEARCH_STATE_POINTER)
        .ok_or_else(|| MatchError::PageParse(format!("no search state at {SEARCH_STATE_POINTER}")))?;

    let last_page = state
        .pointer("/metadata/paging/last")
        .and_then(Value::as_u64)
        .ok_or_else(|| MatchError::PageParse("no metadata.paging.last".to_string()))?;

    let docs = state
        .get("docs")
        .and_then(Value::as_array)
        .ok_or_else(|| MatchError::PageParse("no docs array".to_string()))?;

    let jobs = docs
        .iter()
        .filter(|doc| doc.get("type").and_then(Value::as_str) == Some("job"))
        .map(|doc| job_from_doc(doc, ad_url_prefix))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((jobs, last_page))
}

fn job_from_doc(doc: &Value, ad_url_prefix: &str) -> Result<JobRecord, MatchError> {
    let title = non_empty_str(doc, "job_title")
        .or_else(|| non_empty_str(doc, "heading"))
        .unwrap_or_default();

    let url = match doc.get("canonical_url").and_then(Value::as_str) {
        Some(url) => url.to_string(),
        None => {
            let id = match doc.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => {
                    return Err(MatchError::PageParse(format!(
                        "job '{title}' has neither canonical_url nor id"
                    )));
                }
            };
            format!("{ad_url_prefix}{id}")
        }
    };

    Ok(JobRecord {
        title,
        employer: str_field(doc, "company_name"),
        location: str_field(doc, "location"),
        url,
        deadline: optional_field(doc, "deadline"),
        published: optional_field(doc, "published"),
    })
}

fn non_empty_str(doc: &Value, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn str_field(doc: &Value, key: &str) -> String {
    doc.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_field(doc: &Value, key: &str) -> Option<Value> {
    doc.get(key).filter(|v| !v.is_null()).cloned()
}
