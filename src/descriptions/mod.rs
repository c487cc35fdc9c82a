//! # Job Description Fetching
//!
//! Retrieves the full free-text description of each job posting from its own
//! detail page. Listing pages only carry titles and employers, so the ranking
//! prompt needs this second pass to say anything useful about fit.
//!
//! ## Behavior
//!
//! - **Bounded concurrency**: at most `concurrency` requests are in flight for
//!   one call, however many URLs are passed in
//! - **Order preserving**: output `i` always belongs to input URL `i`
//! - **Best effort**: a URL that fails to load or parse yields `""`; it never
//!   fails the batch
//!
//! ## Text Extraction
//!
//! The description is the visible text of the page's first `<article>`
//! element, one text block per line. Pages without an article yield `""`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::Client;
use reqwest::redirect::Policy;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::Config;
use crate::fetcher::BROWSER_USER_AGENT;

const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Fetches and cleans job descriptions from detail pages.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct DescriptionFetcher {
    client: Client,
    concurrency: usize,
}

impl DescriptionFetcher {
    /// Creates a fetcher with a browser-like User-Agent, a per-request
    /// `timeout` and redirect following.
    ///
    /// A `concurrency` of zero is treated as one.
    pub fn new(timeout: Duration, concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            concurrency: concurrency.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.description_timeout, config.description_concurrency)
    }

    /// Fetches the description of every URL.
    ///
    /// ## Return Value
    ///
    /// A vector with exactly one entry per input URL, in input order. Each
    /// entry is either the cleaned description or `""` when the page could not
    /// be fetched, returned a non-2xx status or has no `<article>`.
    pub async fn fetch_descriptions(&self, urls: &[String]) -> Vec<String> {
        let descriptions = gather_bounded(urls, self.concurrency, |url| async move {
            self.fetch_description(url).await.unwrap_or_else(|e| {
                debug!("Description unavailable for {}: {:#}", url, e);
                String::new()
            })
        })
        .await;

        let found = descriptions.iter().filter(|d| !d.is_empty()).count();
        info!("Fetched {}/{} job descriptions", found, urls.len());

        descriptions
    }

    /// Fetches one description. An absent `<article>` is not an error.
    pub async fn fetch_description(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch job ad")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(extract_article_text(&html))
    }
}

/// Run `task` over every item with at most `limit` running at once. Results
/// come back in item order regardless of completion order.
async fn gather_bounded<'a, T, F, Fut>(items: &'a [T], limit: usize, task: F) -> Vec<Fut::Output>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));

    join_all(items.iter().map(|item| {
        let permits = permits.clone();
        let running = task(item);
        async move {
            let _permit = permits.acquire_owned().await.ok();
            running.await
        }
    }))
    .await
}

/// Visible text of the first `<article>`, one trimmed text block per line.
pub fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("article") else {
        return String::new();
    };
    let Some(article) = document.select(&selector).next() else {
        return String::new();
    };

    article
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            let hidden = parent
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()));
            (!hidden).then(|| text.trim())
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
