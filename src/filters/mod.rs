//! Facet catalog extraction and its process-lifetime cache

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::MatchError;
use crate::models::{FilterCatalog, FilterNode};
use crate::page_data::decode_page_data;
use crate::traits::PageFetcher;

const FILTERS_POINTER: &str = "/queries/0/state/data/filters";
const LOCATION_FACET: &str = "location";

/// Init-once holder for the facet catalog.
///
/// The first successful load is kept for the lifetime of the owner and is
/// never invalidated. Concurrent first callers share a single load; a failed
/// load leaves the cache empty so a later call tries again.
#[derive(Debug, Default)]
pub struct FilterCatalogCache {
    catalog: OnceCell<FilterCatalog>,
}

impl FilterCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
    ) -> Result<&FilterCatalog, MatchError> {
        if let Some(catalog) = self.catalog.get() {
            debug!("Filter catalog served from cache");
            return Ok(catalog);
        }

        self.catalog
            .get_or_try_init(|| load_filter_catalog(fetcher, url))
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.catalog.initialized()
    }
}

/// Fetch the listing page once and extract its facet catalog.
pub async fn load_filter_catalog(
    fetcher: &dyn PageFetcher,
    url: &str,
) -> Result<FilterCatalog, MatchError> {
    info!("Loading filter catalog from {}", url);

    let mut session = fetcher.open_session().await?;
    let page = session.fetch(url).await;
    if let Err(e) = session.close().await {
        warn!("Failed to close page session: {}", e);
    }

    let document = decode_page_data(&page?)?;
    let catalog = extract_filter_catalog(&document)?;

    info!("Loaded {} filter facets", catalog.len());
    Ok(catalog)
}

/// Build the catalog from a decoded listing document.
///
/// Facets without items are left out. The location facet keeps its
/// country/county/municipality nesting; every other facet is flattened.
pub fn extract_filter_catalog(document: &Value) -> Result<FilterCatalog, MatchError> {
    let descriptors = document
        .pointer(FILTERS_POINTER)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            MatchError::FilterExtraction(format!("no filter array at {FILTERS_POINTER}"))
        })?;

    let mut catalog = FilterCatalog::new();

    for descriptor in descriptors {
        let name = descriptor
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| MatchError::FilterExtraction("filter without a name".to_string()))?;

        let items = filter_items(descriptor);
        if items.is_empty() {
            continue;
        }

        // Country level; its items are counties, whose items are municipalities.
        let depth = if name == LOCATION_FACET { 3 } else { 1 };
        let nodes = items
            .iter()
            .map(|item| build_node(item, depth))
            .collect::<Result<Vec<_>, _>>()?;

        catalog.insert(name.to_string(), nodes);
    }

    Ok(catalog)
}

fn filter_items(value: &Value) -> &[Value] {
    value
        .get("filter_items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn build_node(item: &Value, depth: usize) -> Result<FilterNode, MatchError> {
    let label = text_field(item, "display_name")?;
    let value = text_field(item, "value")?;

    let children = if depth > 1 {
        let children = filter_items(item)
            .iter()
            .map(|child| build_node(child, depth - 1))
            .collect::<Result<Vec<_>, _>>()?;
        (!children.is_empty()).then_some(children)
    } else {
        None
    };

    Ok(FilterNode {
        label,
        value,
        children,
    })
}

fn text_field(item: &Value, key: &str) -> Result<String, MatchError> {
    match item.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(MatchError::FilterExtraction(format!(
            "filter item without '{key}'"
        ))),
    }
}
