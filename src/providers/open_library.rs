//! Open Library search API adapter
//!
//! Uses the public `search.json` endpoint for queries and the works endpoint
//! for details. Covers come from the separate covers service, addressed by
//! cover id.

use crate::core::error::{BookshelfError, Result};
use crate::core::isbn::{is_valid_isbn, normalize_isbn};
use crate::core::language::language_name;
use crate::providers::cache::ResponseCache;
use crate::providers::types::{BookMetadataResult, MetadataSearchRequest};
use crate::providers::{search_cache_key, MetadataProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const PROVIDER_NAME: &str = "open_library";
const API_BASE: &str = "https://openlibrary.org";
const COVERS_BASE: &str = "https://covers.openlibrary.org";

/// Subject lists on popular works run to hundreds of entries; keep the head.
const MAX_SUBJECTS: usize = 10;

pub struct OpenLibraryProvider {
    client: reqwest::Client,
    cache: ResponseCache,
}

impl OpenLibraryProvider {
    pub fn new(client: reqwest::Client, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: ResponseCache::new(cache_ttl),
        }
    }

    async fn search_upstream(
        &self,
        request: &MetadataSearchRequest,
        limit: usize,
    ) -> Result<Vec<BookMetadataResult>> {
        let mut params: Vec<(&str, String)> = vec![("limit", limit.to_string())];

        if let Some(isbn) = request.normalized_isbn() {
            params.push(("q", format!("isbn:{isbn}")));
        } else {
            if let Some(title) = request.title.as_deref().map(str::trim) {
                if !title.is_empty() {
                    params.push(("title", title.to_string()));
                }
            }
            if let Some(author) = request.author.as_deref().map(str::trim) {
                if !author.is_empty() {
                    params.push(("author", author.to_string()));
                }
            }
        }

        if params.len() == 1 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(format!("{API_BASE}/search.json"))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Open Library search returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let results = body["docs"]
            .as_array()
            .map(|docs| {
                docs.iter()
                    .filter_map(Self::parse_doc)
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    async fn fetch_upstream(&self, work_id: &str) -> Result<Option<BookMetadataResult>> {
        let response = self
            .client
            .get(format!("{API_BASE}/works/{work_id}.json"))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Open Library work fetch returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        Ok(Self::parse_work(work_id, &body))
    }

    /// Maps one search doc onto the common result shape.
    fn parse_doc(doc: &Value) -> Option<BookMetadataResult> {
        let title = doc["title"].as_str()?.trim();
        if title.is_empty() {
            return None;
        }

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = doc["key"]
            .as_str()
            .map(|key| key.trim_start_matches("/works/").to_string());
        result.title = Some(title.to_string());
        result.subtitle = doc["subtitle"].as_str().map(str::to_string);

        if let Some(authors) = doc["author_name"].as_array() {
            result.authors = authors
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        result.publish_year = doc["first_publish_year"].as_i64().map(|y| y as i32);
        result.page_count = doc["number_of_pages_median"].as_u64().map(|p| p as u32);
        result.rating = doc["ratings_average"].as_f64();
        result.rating_count = doc["ratings_count"].as_u64();

        // The isbn facet mixes 10- and 13-digit forms in one list
        if let Some(isbns) = doc["isbn"].as_array() {
            for isbn in isbns.iter().filter_map(Value::as_str) {
                let normalized = normalize_isbn(isbn);
                if !is_valid_isbn(&normalized) {
                    continue;
                }
                if normalized.len() == 13 && result.isbn13.is_none() {
                    result.isbn13 = Some(normalized);
                } else if normalized.len() == 10 && result.isbn10.is_none() {
                    result.isbn10 = Some(normalized);
                }
                if result.isbn13.is_some() && result.isbn10.is_some() {
                    break;
                }
            }
        }

        if let Some(language) = doc["language"]
            .as_array()
            .and_then(|codes| codes.first())
            .and_then(Value::as_str)
        {
            result.language = Some(language_name(language));
        }

        if let Some(subjects) = doc["subject"].as_array() {
            result.subjects = subjects
                .iter()
                .filter_map(Value::as_str)
                .take(MAX_SUBJECTS)
                .map(str::to_string)
                .collect();
        }

        if let Some(cover_id) = doc["cover_i"].as_i64().filter(|id| *id > 0) {
            result.cover_url = Some(cover_url(cover_id, 'L'));
            result.thumbnail_url = Some(cover_url(cover_id, 'M'));
        }

        Some(result)
    }

    /// Maps a works record onto the common result shape. Works carry less
    /// edition-level detail than search docs (no page counts or ISBNs).
    fn parse_work(work_id: &str, work: &Value) -> Option<BookMetadataResult> {
        let title = work["title"].as_str()?.trim();
        if title.is_empty() {
            return None;
        }

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = Some(work_id.to_string());
        result.title = Some(title.to_string());
        result.subtitle = work["subtitle"].as_str().map(str::to_string);
        result.description = description_text(&work["description"]);

        if let Some(date) = work["first_publish_date"].as_str() {
            result.published_date = Some(date.to_string());
            result.publish_year = trailing_year(date);
        }

        if let Some(subjects) = work["subjects"].as_array() {
            result.subjects = subjects
                .iter()
                .filter_map(Value::as_str)
                .take(MAX_SUBJECTS)
                .map(str::to_string)
                .collect();
        }

        if let Some(cover_id) = work["covers"]
            .as_array()
            .and_then(|covers| covers.iter().filter_map(Value::as_i64).find(|id| *id > 0))
        {
            result.cover_url = Some(cover_url(cover_id, 'L'));
            result.thumbnail_url = Some(cover_url(cover_id, 'M'));
        }

        Some(result)
    }
}

#[async_trait]
impl MetadataProvider for OpenLibraryProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Open Library"
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
                tracing::warn!(provider = PROVIDER_NAME, work_id = provider_id, error = %e, "Detail fetch failed");
                None
            }
        }
    }
}

fn cover_url(cover_id: i64, size: char) -> String {
    format!("{COVERS_BASE}/b/id/{cover_id}-{size}.jpg")
}

/// Work descriptions are either a bare string or a `/type/text` object.
fn description_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map.get("value").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Years in `first_publish_date` appear bare ("1937") or after a month
/// ("September 21, 1937").
fn trailing_year(date: &str) -> Option<i32> {
    let digits: Vec<&str> = date
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| part.len() == 4)
        .collect();
    digits.last().and_then(|year| year.parse().ok())
}
