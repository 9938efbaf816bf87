//! Data types shared across metadata providers

use crate::core::isbn::{is_valid_isbn, normalize_isbn};
use serde::{Deserialize, Serialize};

/// A metadata query. All fields are optional; at least one should be present
/// for a search to return anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataSearchRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl MetadataSearchRequest {
    /// True when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        let blank = |f: &Option<String>| f.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.title) && blank(&self.author) && blank(&self.isbn)
    }

    /// The requested ISBN in normalized form, when present and structurally valid.
    pub fn normalized_isbn(&self) -> Option<String> {
        let raw = self.isbn.as_deref()?;
        let normalized = normalize_isbn(raw);
        if is_valid_isbn(&normalized) {
            Some(normalized)
        } else {
            None
        }
    }
}

/// One candidate book as seen by one provider.
///
/// Every field except `provider` is a hint, not an authority; the aggregator
/// scores results against the request rather than trusting any single source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadataResult {
    /// Machine name of the source provider
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn10: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moods: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_total: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
}

impl BookMetadataResult {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }
}

/// Partial per-provider settings, merged into the registry by `configure`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub enabled: Option<bool>,
    pub priority: Option<u32>,
    pub api_key: Option<String>,
    pub domain: Option<String>,
}

/// One provider as presented to settings UIs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOverview {
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    pub priority: u32,
    pub requires_auth: bool,
    pub available: bool,
}

/// The winning candidate from a best-match aggregation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatch {
    pub score: i32,
    pub result: BookMetadataResult,
}
