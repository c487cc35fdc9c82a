//! Capabilities the pipeline consumes without owning their mechanics

use anyhow::Result;
use async_trait::async_trait;

use crate::page_data::RenderedPage;

/// Produces page sessions for loading rendered listing pages.
///
/// Sessions are not assumed to be shareable: a caller that wants to load
/// pages in parallel opens one session per worker.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Open a new session (a browser tab, a connection pool, ...)
    async fn open_session(&self) -> Result<Box<dyn PageSession>>;
}

/// An owned handle used to load pages one after another.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate to `url`, wait for the page to settle and return its content.
    async fn fetch(&mut self, url: &str) -> Result<RenderedPage>;

    /// Release the session.
    async fn close(self: Box<Self>) -> Result<()>;
}
