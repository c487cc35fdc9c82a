//! HTTP-backed page fetcher

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::page_data::RenderedPage;
use crate::traits::{PageFetcher, PageSession};

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Loads listing pages with plain HTTP requests.
///
/// The listing site renders its search state server-side, so a GET returns
/// the same embedded payload a browser would see.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    timeout: Duration,
    settle_delay: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, settle_delay: Duration) -> Self {
        Self {
            timeout,
            settle_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.page_timeout, config.settle_delay)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn open_session(&self) -> Result<Box<dyn PageSession>> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Box::new(HttpPageSession {
            client,
            settle_delay: self.settle_delay,
        }))
    }
}

pub struct HttpPageSession {
    client: Client,
    settle_delay: Duration,
}

#[async_trait]
impl PageSession for HttpPageSession {
    async fn fetch(&mut self, url: &str) -> Result<RenderedPage> {
        debug!("Fetching page: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch {}: HTTP {}", url, response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        Ok(RenderedPage::new(url, html))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
