//! Hardcover API adapter
//!
//! Hardcover exposes a GraphQL endpoint authenticated with a bearer token.
//! Without a token the adapter reports itself unavailable and serves empty
//! results.

use crate::core::error::{BookshelfError, Result};
use crate::core::isbn::{is_valid_isbn, normalize_isbn};
use crate::providers::cache::ResponseCache;
use crate::providers::types::{BookMetadataResult, MetadataSearchRequest, ProviderSettings};
use crate::providers::{search_cache_key, MetadataProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;

const PROVIDER_NAME: &str = "hardcover";
const API_URL: &str = "https://api.hardcover.app/v1/graphql";

const SEARCH_QUERY: &str = r#"
query SearchBooks($query: String!, $limit: Int!) {
  books(where: {title: {_ilike: $query}}, order_by: {users_count: desc}, limit: $limit) {
    id
    title
    subtitle
    description
    pages
    release_year
    rating
    ratings_count
    image { url }
    contributions { author { name } }
    book_series { position series { name books_count } }
    editions { isbn_10 isbn_13 }
  }
}
"#;

const DETAILS_QUERY: &str = r#"
query BookDetails($id: Int!) {
  books_by_pk(id: $id) {
    id
    title
    subtitle
    description
    pages
    release_year
    rating
    ratings_count
    image { url }
    contributions { author { name } }
    book_series { position series { name books_count } }
    editions { isbn_10 isbn_13 }
  }
}
"#;

pub struct HardcoverProvider {
    client: reqwest::Client,
    cache: ResponseCache,
    api_token: RwLock<Option<String>>,
}

impl HardcoverProvider {
    pub fn new(client: reqwest::Client, cache_ttl: Duration, api_token: Option<String>) -> Self {
        Self {
            client,
            cache: ResponseCache::new(cache_ttl),
            api_token: RwLock::new(api_token.filter(|token| !token.trim().is_empty())),
        }
    }

    async fn current_token(&self) -> Option<String> {
        self.api_token.read().await.clone()
    }

    async fn execute(&self, token: &str, query: &str, variables: Value) -> Result<Value> {
        let response = self
            .client
            .post(API_URL)
            .header("authorization", format!("Bearer {token}"))
            .json(&json!({"query": query, "variables": variables}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Hardcover returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        if let Some(message) = body["errors"][0]["message"].as_str() {
            return Err(BookshelfError::UpstreamError(format!(
                "Hardcover GraphQL error: {message}"
            )));
        }
        Ok(body)
    }

    async fn search_upstream(
        &self,
        request: &MetadataSearchRequest,
        limit: usize,
    ) -> Result<Vec<BookMetadataResult>> {
        let Some(token) = self.current_token().await else {
            tracing::debug!(provider = PROVIDER_NAME, "No API token configured, skipping search");
            return Ok(Vec::new());
        };

        let title = request.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return Ok(Vec::new());
        }

        let variables = json!({"query": format!("%{title}%"), "limit": limit as i64});
        let body = self.execute(&token, SEARCH_QUERY, variables).await?;

        let results = body["data"]["books"]
            .as_array()
            .map(|books| {
                books
                    .iter()
                    .filter_map(Self::parse_book)
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    async fn fetch_upstream(&self, book_id: &str) -> Result<Option<BookMetadataResult>> {
        let Some(token) = self.current_token().await else {
            tracing::debug!(provider = PROVIDER_NAME, "No API token configured, skipping fetch");
            return Ok(None);
        };

        // Hardcover ids are numeric; anything else cannot exist there
        let Ok(id) = book_id.parse::<i64>() else {
            return Ok(None);
        };

        let body = self
            .execute(&token, DETAILS_QUERY, json!({"id": id}))
            .await?;
        Ok(Self::parse_book(&body["data"]["books_by_pk"]))
    }

    fn parse_book(book: &Value) -> Option<BookMetadataResult> {
        let title = book["title"].as_str()?.trim();
        if title.is_empty() {
            return None;
        }

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = book["id"].as_i64().map(|id| id.to_string());
        result.title = Some(title.to_string());
        result.subtitle = book["subtitle"].as_str().map(str::to_string);
        result.description = book["description"].as_str().map(str::to_string);
        result.page_count = book["pages"].as_u64().map(|pages| pages as u32);
        result.publish_year = book["release_year"].as_i64().map(|year| year as i32);
        result.rating = book["rating"].as_f64();
        result.rating_count = book["ratings_count"].as_u64();
        result.cover_url = book["image"]["url"].as_str().map(str::to_string);

        if let Some(contributions) = book["contributions"].as_array() {
            result.authors = contributions
                .iter()
                .filter_map(|c| c["author"]["name"].as_str())
                .map(str::to_string)
                .collect();
        }

        if let Some(entry) = book["book_series"].as_array().and_then(|s| s.first()) {
            result.series_name = entry["series"]["name"].as_str().map(str::to_string);
            result.series_number = entry["position"].as_f64();
            result.series_total = entry["series"]["books_count"]
                .as_u64()
                .map(|count| count as u32);
        }

        if let Some(editions) = book["editions"].as_array() {
            for edition in editions {
                if result.isbn13.is_none() {
                    if let Some(isbn) = edition["isbn_13"].as_str() {
                        let normalized = normalize_isbn(isbn);
                        if is_valid_isbn(&normalized) {
                            result.isbn13 = Some(normalized);
                        }
                    }
                }
                if result.isbn10.is_none() {
                    if let Some(isbn) = edition["isbn_10"].as_str() {
                        let normalized = normalize_isbn(isbn);
                        if is_valid_isbn(&normalized) {
                            result.isbn10 = Some(normalized);
                        }
                    }
                }
                if result.isbn13.is_some() && result.isbn10.is_some() {
                    break;
                }
            }
        }

        Some(result)
    }
}

#[async_trait]
impl MetadataProvider for HardcoverProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Hardcover"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        self.api_token.read().await.is_some()
    }

    async fn apply_settings(&self, settings: &ProviderSettings) {
        if let Some(token) = settings.api_key.as_deref() {
            let token = token.trim();
            *self.api_token.write().await = if token.is_empty() {
                None
            } else {
                Some(token.to_string())
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
                tracing::warn!(provider = PROVIDER_NAME, book_id = provider_id, error = %e, "Detail fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book() {
        let book = json!({
            "id": 321,
            "title": "The Fifth Season",
            "description": "The way the world ends for the last time.",
            "pages": 468,
            "release_year": 2015,
            "rating": 4.3,
            "ratings_count": 9120,
            "image": {"url": "https://assets.hardcover.app/books/321/cover.jpg"},
            "contributions": [{"author": {"name": "N.K. Jemisin"}}],
            "book_series": [{"position": 1, "series": {"name": "The Broken Earth", "books_count": 3}}],
            "editions": [
                {"isbn_10": null, "isbn_13": "9780316229296"},
                {"isbn_10": "0316229296", "isbn_13": null}
            ]
        });

        let result = HardcoverProvider::parse_book(&book).unwrap();
        assert_eq!(result.provider_id.as_deref(), Some("321"));
        assert_eq!(result.title.as_deref(), Some("The Fifth Season"));
        assert_eq!(result.authors, vec!["N.K. Jemisin"]);
        assert_eq!(result.series_name.as_deref(), Some("The Broken Earth"));
        assert_eq!(result.series_number, Some(1.0));
        assert_eq!(result.series_total, Some(3));
        assert_eq!(result.isbn13.as_deref(), Some("9780316229296"));
        assert_eq!(result.isbn10.as_deref(), Some("0316229296"));
        assert_eq!(result.page_count, Some(468));
        assert_eq!(result.publish_year, Some(2015));
    }

    #[test]
    fn test_parse_book_null_is_none() {
        assert!(HardcoverProvider::parse_book(&Value::Null).is_none());
    }

    #[tokio::test]
    async fn test_availability_tracks_token_presence() {
        let provider =
            HardcoverProvider::new(reqwest::Client::new(), Duration::from_secs(60), None);
        assert!(provider.requires_auth());
        assert!(!provider.is_available().await);

        provider
            .apply_settings(&ProviderSettings {
                api_key: Some("hc_token".into()),
                ..Default::default()
            })
            .await;
        assert!(provider.is_available().await);
    }

    #[tokio::test]
    async fn test_fetch_details_rejects_non_numeric_ids() {
        let provider = HardcoverProvider::new(
            reqwest::Client::new(),
            Duration::from_secs(60),
            Some("token".into()),
        );
        assert!(provider.fetch_details("not-a-number").await.is_none());
    }
}
