//! Google Books volumes API adapter
//!
//! <https://developers.google.com/books/docs/v1/using> — anonymous access,
//! queried with the `intitle:`/`inauthor:`/`isbn:` field operators.

use crate::core::error::{BookshelfError, Result};
use crate::core::isbn::normalize_isbn;
use crate::core::language::language_name;
use crate::providers::cache::ResponseCache;
use crate::providers::types::{BookMetadataResult, MetadataSearchRequest};
use crate::providers::{search_cache_key, MetadataProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const PROVIDER_NAME: &str = "google_books";
const API_BASE: &str = "https://www.googleapis.com/books/v1";

pub struct GoogleBooksProvider {
    client: reqwest::Client,
    cache: ResponseCache,
}

impl GoogleBooksProvider {
    pub fn new(client: reqwest::Client, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: ResponseCache::new(cache_ttl),
        }
    }

    /// Builds a field-scoped query string. An ISBN is the strongest signal,
    /// so it is always included when present.
    fn build_query(request: &MetadataSearchRequest) -> String {
        let mut terms = Vec::new();

        if let Some(isbn) = request.normalized_isbn() {
            terms.push(format!("isbn:{isbn}"));
        }
        if let Some(title) = request.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                terms.push(format!("intitle:{title}"));
            }
        }
        if let Some(author) = request.author.as_deref().map(str::trim) {
            if !author.is_empty() {
                terms.push(format!("inauthor:{author}"));
            }
        }

        terms.join(" ")
    }

    async fn search_upstream(
        &self,
        request: &MetadataSearchRequest,
        limit: usize,
    ) -> Result<Vec<BookMetadataResult>> {
        let query = Self::build_query(request);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(format!("{API_BASE}/volumes"))
            .query(&[
                ("q", query.as_str()),
                ("maxResults", &limit.to_string()),
                ("printType", "books"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Google Books search returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let results = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Self::parse_volume)
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    async fn fetch_upstream(&self, volume_id: &str) -> Result<Option<BookMetadataResult>> {
        let response = self
            .client
            .get(format!("{API_BASE}/volumes/{volume_id}"))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Google Books volume fetch returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        Ok(Self::parse_volume(&body))
    }

    /// Maps one `volumes` item onto the common result shape. Items without a
    /// title are useless downstream and are dropped.
    fn parse_volume(item: &Value) -> Option<BookMetadataResult> {
        let info = item.get("volumeInfo")?;
        let title = info["title"].as_str()?.trim();
        if title.is_empty() {
            return None;
        }

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = item["id"].as_str().map(str::to_string);
        result.title = Some(title.to_string());
        result.subtitle = info["subtitle"].as_str().map(str::to_string);
        result.publisher = info["publisher"].as_str().map(str::to_string);
        result.description = info["description"].as_str().map(str::to_string);

        if let Some(authors) = info["authors"].as_array() {
            result.authors = authors
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        if let Some(date) = info["publishedDate"].as_str() {
            result.published_date = Some(date.to_string());
            result.publish_year = year_from_date(date);
        }

        if let Some(identifiers) = info["industryIdentifiers"].as_array() {
            for identifier in identifiers {
                let value = identifier["identifier"].as_str().map(normalize_isbn);
                match (identifier["type"].as_str(), value) {
                    (Some("ISBN_10"), Some(isbn)) => result.isbn10 = Some(isbn),
                    (Some("ISBN_13"), Some(isbn)) => result.isbn13 = Some(isbn),
                    _ => {}
                }
            }
        }

        result.page_count = info["pageCount"].as_u64().map(|p| p as u32);
        result.language = info["language"].as_str().map(language_name);
        result.rating = info["averageRating"].as_f64();
        result.rating_count = info["ratingsCount"].as_u64();

        if let Some(categories) = info["categories"].as_array() {
            result.genres = categories
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        let thumbnail = info["imageLinks"]["thumbnail"]
            .as_str()
            .map(upgrade_to_https);
        let small = info["imageLinks"]["small"].as_str().map(upgrade_to_https);
        result.cover_url = small.or_else(|| thumbnail.clone());
        result.thumbnail_url = thumbnail;

        Some(result)
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Google Books"
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

/// Leading year of a `publishedDate`, which may be `YYYY`, `YYYY-MM` or
/// `YYYY-MM-DD`.
fn year_from_date(date: &str) -> Option<i32> {
    let digits: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 4 {
        digits[..4].parse().ok()
    } else {
        None
    }
}

fn upgrade_to_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}
