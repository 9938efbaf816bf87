//! ComicVine API adapter
//!
//! Searches comic volumes through the ComicVine REST API. Requires an API
//! key, passed as the `api_key` query parameter; without one the adapter
//! reports itself unavailable and serves empty results.

use crate::core::error::{BookshelfError, Result};
use crate::core::text::clean_html_fragment;
use crate::providers::cache::ResponseCache;
use crate::providers::types::{BookMetadataResult, MetadataSearchRequest, ProviderSettings};
use crate::providers::{search_cache_key, MetadataProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;

const PROVIDER_NAME: &str = "comicvine";
const API_BASE: &str = "https://comicvine.gamespot.com/api";

/// ComicVine resource ids are namespaced by type; 4050 is "volume".
const VOLUME_TYPE_PREFIX: &str = "4050-";

pub struct ComicVineProvider {
    client: reqwest::Client,
    cache: ResponseCache,
    api_key: RwLock<Option<String>>,
}

impl ComicVineProvider {
    pub fn new(client: reqwest::Client, cache_ttl: Duration, api_key: Option<String>) -> Self {
        Self {
            client,
            cache: ResponseCache::new(cache_ttl),
            api_key: RwLock::new(api_key.filter(|key| !key.trim().is_empty())),
        }
    }

    async fn current_key(&self) -> Option<String> {
        self.api_key.read().await.clone()
    }

    fn build_query(request: &MetadataSearchRequest) -> String {
        request
            .title
            .as_deref()
            .or(request.author.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    async fn search_upstream(
        &self,
        request: &MetadataSearchRequest,
        limit: usize,
    ) -> Result<Vec<BookMetadataResult>> {
        let Some(key) = self.current_key().await else {
            tracing::debug!(provider = PROVIDER_NAME, "No API key configured, skipping search");
            return Ok(Vec::new());
        };

        let query = Self::build_query(request);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(format!("{API_BASE}/search/"))
            .query(&[
                ("api_key", key.as_str()),
                ("format", "json"),
                ("resources", "volume"),
                ("query", query.as_str()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "ComicVine search returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let results = Self::unwrap_envelope(&body)?;
        let volumes = results
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Self::parse_volume)
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default();

        Ok(volumes)
    }

    async fn fetch_upstream(&self, volume_id: &str) -> Result<Option<BookMetadataResult>> {
        let Some(key) = self.current_key().await else {
            tracing::debug!(provider = PROVIDER_NAME, "No API key configured, skipping fetch");
            return Ok(None);
        };

        let id = volume_id.trim_start_matches(VOLUME_TYPE_PREFIX);
        let response = self
            .client
            .get(format!("{API_BASE}/volume/{VOLUME_TYPE_PREFIX}{id}/"))
            .query(&[("api_key", key.as_str()), ("format", "json")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "ComicVine volume fetch returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        // "Object Not Found" comes back as an envelope error, not HTTP 404
        match Self::unwrap_envelope(&body) {
            Ok(results) => Ok(Self::parse_volume(results)),
            Err(_) => Ok(None),
        }
    }

    /// Every ComicVine response wraps its payload in a status envelope.
    fn unwrap_envelope(body: &Value) -> Result<&Value> {
        if body["status_code"].as_i64() == Some(1) {
            Ok(&body["results"])
        } else {
            let message = body["error"].as_str().unwrap_or("unknown error");
            Err(BookshelfError::UpstreamError(format!(
                "ComicVine error: {message}"
            )))
        }
    }

    fn parse_volume(volume: &Value) -> Option<BookMetadataResult> {
        let title = volume["name"].as_str()?.trim();
        if title.is_empty() {
            return None;
        }

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = volume["id"].as_i64().map(|id| id.to_string());
        result.title = Some(title.to_string());
        result.publisher = volume["publisher"]["name"].as_str().map(str::to_string);
        result.publish_year = volume["start_year"]
            .as_str()
            .and_then(|year| year.trim().parse().ok());
        result.series_total = volume["count_of_issues"].as_u64().map(|count| count as u32);

        result.description = volume["description"]
            .as_str()
            .map(clean_html_fragment)
            .filter(|text| !text.is_empty())
            .or_else(|| volume["deck"].as_str().map(str::to_string));

        result.cover_url = volume["image"]["original_url"]
            .as_str()
            .or_else(|| volume["image"]["medium_url"].as_str())
            .map(str::to_string);
        result.thumbnail_url = volume["image"]["thumb_url"]
            .as_str()
            .or_else(|| volume["image"]["small_url"].as_str())
            .map(str::to_string);

        Some(result)
    }
}

#[async_trait]
impl MetadataProvider for ComicVineProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "ComicVine"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    async fn apply_settings(&self, settings: &ProviderSettings) {
        if let Some(key) = settings.api_key.as_deref() {
            let key = key.trim();
            *self.api_key.write().await = if key.is_empty() {
                None
            } else {
                Some(key.to_string())
            };
        }
    }

    async fn search(
        &self,
        request: &MetadataSearchRequest,
        limit: usize,
    ) -> Vec<BookMetadataResult> {
        let key = search_cache_key(request, limit);
        if let Some(hit) = self.cache.get_search(&key).await {
            return hit;
        }

        match self.search_upstream(request, limit).await {
            Ok(results) => {
                self.cache.put_search(key, results.clone()).await;
                results
            }
            Err(e) => {
                tracing::warn!(provider = PROVIDER_NAME, error = %e, "Search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_details(&self, provider_id: &str) -> Option<BookMetadataResult> {
        if let Some(hit) = self.cache.get_details(provider_id).await {
            return hit;
        }

        match self.fetch_upstream(provider_id).await {
            Ok(details) => {
                self.cache
                    .put_details(provider_id.to_string(), details.clone())
                    .await;
                details
            }
            Err(e) => {
                tracing::warn!(provider = PROVIDER_NAME, volume_id = provider_id, error = %e, "Detail fetch failed");
                None
            }
        }
    }
}
