//! Data models for scraped job listings, facet catalogs and ranking output

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job posting scraped from a listing page.
///
/// `url` identifies the posting within a scraped batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    #[serde(default)]
    pub employer: String,
    #[serde(default)]
    pub location: String,
    pub url: String,
    /// Passed through as found in the page payload (string or timestamp).
    #[serde(default)]
    pub deadline: Option<Value>,
    #[serde(default)]
    pub published: Option<Value>,
}

/// One selectable value of a search facet. Only the location facet nests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNode {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FilterNode>>,
}

impl FilterNode {
    pub fn leaf(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            children: None,
        }
    }
}

/// Facet name to its selectable values.
pub type FilterCatalog = BTreeMap<String, Vec<FilterNode>>;

/// A search parameter value. Arrays repeat the key in the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multi(vs) => vs,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// Listing search parameters, e.g. `{"q": "rust", "location": ["0.20001", "0.20061"]}`.
pub type SearchParams = BTreeMap<String, ParamValue>;

/// A single entry of the model's ranking, referencing the analyzed batch by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub job_index: usize,
    pub match_score: u8,
    pub summary: String,
}

/// A job record merged with its score and rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub job: JobRecord,
    pub match_score: u8,
    pub summary: String,
}
