//! Amazon scraping adapter
//!
//! Scrapes book search listings (`/s?k=...&i=stripbooks`) and product pages
//! (`/dp/{asin}`). The storefront domain is configurable at runtime so users
//! outside the US can point at a regional site. Paced like Goodreads; cache
//! hits skip pacing.

use crate::core::error::{BookshelfError, Result};
use crate::core::isbn::normalize_isbn;
use crate::core::language::language_name;
use crate::core::text::{clean_html_fragment, collapse_whitespace, decode_html_entities};
use crate::import::series::split_series;
use crate::providers::cache::ResponseCache;
use crate::providers::throttle::RequestPacer;
use crate::providers::types::{BookMetadataResult, MetadataSearchRequest, ProviderSettings};
use crate::providers::{search_cache_key, MetadataProvider};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use tokio::sync::RwLock;

const PROVIDER_NAME: &str = "amazon";

lazy_static! {
    static ref SEARCH_ITEM_RE: Regex = Regex::new(
        r#"<div[^>]*data-asin="([A-Z0-9]{10})"[^>]*data-component-type="s-search-result""#
    )
    .unwrap();

    static ref ITEM_TITLE_H2_RE: Regex =
        Regex::new(r#"(?s)<h2[^>]*>\s*<a[^>]*>\s*<span[^>]*>([^<]+)</span>"#).unwrap();
    static ref ITEM_TITLE_MEDIUM_RE: Regex =
        Regex::new(r#"<span class="a-size-medium[^"]*"[^>]*>([^<]+)</span>"#).unwrap();
    static ref ITEM_TITLE_BASE_PLUS_RE: Regex =
        Regex::new(r#"<span class="a-size-base-plus[^"]*"[^>]*>([^<]+)</span>"#).unwrap();

    static ref ITEM_AUTHOR_RE: Regex =
        Regex::new(r#"(?s)<span class="a-size-base"[^>]*>\s*by\s*</span>\s*<a[^>]*>([^<]+)</a>"#)
            .unwrap();
    static ref ITEM_AUTHOR_LOOSE_RE: Regex =
        Regex::new(r#"(?s)>\s*by\s*</span>.{0,200}?<a[^>]*>([^<]+)</a>"#).unwrap();

    static ref ITEM_COVER_RE: Regex =
        Regex::new(r#"<img[^>]*class="s-image"[^>]*src="([^"]+)""#).unwrap();
    static ref STARS_RE: Regex =
        Regex::new(r#"<span[^>]*class="a-icon-alt"[^>]*>([\d.]+) out of 5"#).unwrap();

    // Product page
    static ref PRODUCT_TITLE_RE: Regex =
        Regex::new(r#"(?s)<span id="productTitle"[^>]*>\s*(.+?)\s*</span>"#).unwrap();
    static ref CONTRIBUTOR_RE: Regex =
        Regex::new(r#"<a class="contributorNameID"[^>]*>([^<]+)</a>"#).unwrap();
    static ref AUTHOR_SPAN_RE: Regex =
        Regex::new(r#"(?s)<span class="author[^"]*"[^>]*>.*?<a[^>]*>([^<]+)</a>"#).unwrap();

    static ref LANDING_IMAGE_RE: Regex =
        Regex::new(r#"<img[^>]*id="landingImage"[^>]*src="([^"]+)""#).unwrap();
    static ref HIRES_IMAGE_RE: Regex = Regex::new(r#""hiRes":"(https://[^"]+)""#).unwrap();
    static ref FRONT_IMAGE_RE: Regex =
        Regex::new(r#"<img[^>]*id="imgBlkFront"[^>]*src="([^"]+)""#).unwrap();

    static ref DESCRIPTION_DIV_RE: Regex =
        Regex::new(r#"(?s)<div id="bookDescription_feature_div"[^>]*>(.+?)</div>"#).unwrap();
    static ref DESCRIPTION_OG_RE: Regex =
        Regex::new(r#"<meta property="og:description" content="([^"]+)""#).unwrap();

    // "Product details" bullets: `<span class="a-text-bold">Label : </span> <span>value</span>`
    static ref DETAIL_PUBLISHER_RE: Regex =
        Regex::new(r#"(?s)Publisher[^<]*</span>\s*<span>([^<]+)</span>"#).unwrap();
    static ref DETAIL_LANGUAGE_RE: Regex =
        Regex::new(r#"(?s)Language[^<]*</span>\s*<span>([^<]+)</span>"#).unwrap();
    static ref DETAIL_ISBN10_RE: Regex =
        Regex::new(r#"(?s)ISBN-10[^<]*</span>\s*<span>\s*([0-9]{9}[0-9X])"#).unwrap();
    static ref DETAIL_ISBN13_RE: Regex =
        Regex::new(r#"(?s)ISBN-13[^<]*</span>\s*<span>\s*([0-9][0-9\-]{11,16})"#).unwrap();
    static ref DETAIL_PAGES_RE: Regex = Regex::new(r"(\d+)\s+pages").unwrap();
    static ref REVIEW_COUNT_RE: Regex =
        Regex::new(r#"id="acrCustomerReviewText"[^>]*>([\d,]+) ratings"#).unwrap();
    static ref YEAR_IN_PARENS_RE: Regex =
        Regex::new(r"\((?:[A-Za-z]+\.?\s+\d{1,2},?\s+)?(\d{4})\)").unwrap();

    static ref ITEM_TITLE_CHAIN: Vec<&'static Regex> =
        vec![&ITEM_TITLE_H2_RE, &ITEM_TITLE_MEDIUM_RE, &ITEM_TITLE_BASE_PLUS_RE];
    static ref ITEM_AUTHOR_CHAIN: Vec<&'static Regex> =
        vec![&ITEM_AUTHOR_RE, &ITEM_AUTHOR_LOOSE_RE];
    static ref PRODUCT_COVER_CHAIN: Vec<&'static Regex> =
        vec![&LANDING_IMAGE_RE, &HIRES_IMAGE_RE, &FRONT_IMAGE_RE];
    static ref PRODUCT_DESCRIPTION_CHAIN: Vec<&'static Regex> =
        vec![&DESCRIPTION_DIV_RE, &DESCRIPTION_OG_RE];
}

pub struct AmazonProvider {
    client: reqwest::Client,
    cache: ResponseCache,
    pacer: RequestPacer,
    domain: RwLock<String>,
}

impl AmazonProvider {
    pub fn new(
        client: reqwest::Client,
        cache_ttl: Duration,
        min_request_interval: Duration,
        domain: String,
    ) -> Self {
        Self {
            client,
            cache: ResponseCache::new(cache_ttl),
            pacer: RequestPacer::new(min_request_interval),
            domain: RwLock::new(domain),
        }
    }

    fn build_query(request: &MetadataSearchRequest) -> String {
        if let Some(isbn) = request.normalized_isbn() {
            return isbn;
        }

        let mut parts = Vec::new();
        if let Some(title) = request.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                parts.push(title);
            }
        }
        if let Some(author) = request.author.as_deref().map(str::trim) {
            if !author.is_empty() {
                parts.push(author);
            }
        }
        parts.join(" ")
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

        self.pacer.pace().await;

        let domain = self.domain.read().await.clone();
        let response = self
            .client
            .get(format!("https://www.{domain}/s"))
            .query(&[("k", query.as_str()), ("i", "stripbooks")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Amazon search returned HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(Self::parse_search_page(&html, limit))
    }

    async fn fetch_upstream(&self, asin: &str) -> Result<Option<BookMetadataResult>> {
        self.pacer.pace().await;

        let domain = self.domain.read().await.clone();
        let response = self
            .client
            .get(format!("https://www.{domain}/dp/{asin}"))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Amazon product page returned HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(Self::parse_product_page(asin, &html))
    }

    /// Walks the result listing. Each item's ASIN anchors a slice of the page
    /// that the per-field patterns run against.
    fn parse_search_page(html: &str, limit: usize) -> Vec<BookMetadataResult> {
        let anchors: Vec<(String, usize)> = SEARCH_ITEM_RE
            .captures_iter(html)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some((caps[1].to_string(), whole.start()))
            })
            .collect();

        let mut results = Vec::new();
        for (index, (asin, start)) in anchors.iter().enumerate() {
            if results.len() >= limit {
                break;
            }

            let end = anchors
                .get(index + 1)
                .map(|(_, next_start)| *next_start)
                .unwrap_or(html.len());
            let block = &html[*start..end];

            let Some(title) = first_capture(block, &ITEM_TITLE_CHAIN) else {
                continue;
            };

            let mut result = BookMetadataResult::new(PROVIDER_NAME);
            result.provider_id = Some(asin.clone());
            result.asin = Some(asin.clone());
            result.title = Some(collapse_whitespace(&decode_html_entities(&title)));

            if let Some(author) = first_capture(block, &ITEM_AUTHOR_CHAIN) {
                result.authors = vec![collapse_whitespace(&decode_html_entities(&author))];
            }
            if let Some(caps) = ITEM_COVER_RE.captures(block) {
                result.cover_url = Some(caps[1].to_string());
                result.thumbnail_url = Some(caps[1].to_string());
            }
            if let Some(caps) = STARS_RE.captures(block) {
                result.rating = caps[1].parse().ok();
            }

            results.push(result);
        }

        results
    }

    fn parse_product_page(asin: &str, html: &str) -> Option<BookMetadataResult> {
        let raw_title = PRODUCT_TITLE_RE
            .captures(html)
            .map(|caps| caps[1].to_string())?;
        let (title, series) =
            split_series(&collapse_whitespace(&decode_html_entities(&raw_title)));

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = Some(asin.to_string());
        result.asin = Some(asin.to_string());
        result.title = Some(title);
        if let Some(series) = series {
            result.series_name = Some(series.name);
            result.series_number = Some(series.number);
        }

        result.authors = product_authors(html);
        result.cover_url =
            first_capture(html, &PRODUCT_COVER_CHAIN).map(|url| decode_html_entities(&url));
        result.description = first_capture(html, &PRODUCT_DESCRIPTION_CHAIN)
            .map(|fragment| clean_html_fragment(&fragment))
            .filter(|text| !text.is_empty());

        if let Some(caps) = DETAIL_PUBLISHER_RE.captures(html) {
            let raw = decode_html_entities(caps[1].trim());
            result.publish_year = YEAR_IN_PARENS_RE
                .captures(&raw)
                .and_then(|c| c[1].parse().ok());
            let name = raw.split(" (").next().unwrap_or(&raw).trim();
            if !name.is_empty() {
                result.publisher = Some(name.to_string());
            }
        }

        if let Some(caps) = DETAIL_LANGUAGE_RE.captures(html) {
            result.language = Some(language_name(caps[1].trim()));
        }
        if let Some(caps) = DETAIL_ISBN10_RE.captures(html) {
            result.isbn10 = Some(caps[1].to_string());
        }
        if let Some(caps) = DETAIL_ISBN13_RE.captures(html) {
            result.isbn13 = Some(normalize_isbn(&caps[1]));
        }
        result.page_count = DETAIL_PAGES_RE
            .captures(html)
            .and_then(|caps| caps[1].parse().ok());
        result.rating = STARS_RE.captures(html).and_then(|caps| caps[1].parse().ok());
        result.rating_count = REVIEW_COUNT_RE
            .captures(html)
            .and_then(|caps| caps[1].replace(',', "").parse().ok());

        Some(result)
    }
}

#[async_trait]
impl MetadataProvider for AmazonProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Amazon"
    }

    async fn apply_settings(&self, settings: &ProviderSettings) {
        if let Some(domain) = settings.domain.as_deref().map(str::trim) {
            if !domain.is_empty() {
                *self.domain.write().await = domain.to_string();
            }
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
                tracing::warn!(provider = PROVIDER_NAME, asin = provider_id, error = %e, "Detail fetch failed");
                None
            }
        }
    }
}

fn first_capture(html: &str, chain: &[&Regex]) -> Option<String> {
    chain.iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

fn product_authors(html: &str) -> Vec<String> {
    let mut authors: Vec<String> = CONTRIBUTOR_RE
        .captures_iter(html)
        .map(|caps| collapse_whitespace(&decode_html_entities(caps[1].trim())))
        .collect();
    authors.dedup();

    if authors.is_empty() {
        if let Some(caps) = AUTHOR_SPAN_RE.captures(html) {
            authors.push(collapse_whitespace(&decode_html_entities(caps[1].trim())));
        }
    }
    authors
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
      <div data-asin="0441172717" data-component-type="s-search-result" class="s-result-item">
        <img class="s-image" src="https://m.media-amazon.com/images/I/81zN7udGRUL._AC_UY218_.jpg" />
        <h2 class="a-size-mini"><a class="a-link-normal" href="/dp/0441172717"><span class="a-text-normal">Dune</span></a></h2>
        <span class="a-size-base">by</span> <a class="a-link-normal">Frank Herbert</a>
        <span class="a-icon-alt">4.7 out of 5 stars</span>
      </div>
      <div data-asin="B08JTYQJVE" data-component-type="s-search-result" class="s-result-item">
        <h2 class="a-size-mini"><a class="a-link-normal" href="/dp/B08JTYQJVE"><span class="a-text-normal">Dune Messiah</span></a></h2>
      </div>"#;

    #[test]
    fn test_parse_search_page() {
        let results = AmazonProvider::parse_search_page(SEARCH_PAGE, 10);
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].asin.as_deref(), Some("0441172717"));
        assert_eq!(results[0].title.as_deref(), Some("Dune"));
        assert_eq!(results[0].authors, vec!["Frank Herbert"]);
        assert_eq!(results[0].rating, Some(4.7));
        assert!(results[0].cover_url.is_some());

        assert_eq!(results[1].asin.as_deref(), Some("B08JTYQJVE"));
        assert_eq!(results[1].title.as_deref(), Some("Dune Messiah"));
        assert!(results[1].authors.is_empty());
    }

    #[test]
    fn test_parse_search_page_respects_limit() {
        assert_eq!(AmazonProvider::parse_search_page(SEARCH_PAGE, 1).len(), 1);
    }

    #[test]
    fn test_parse_product_page() {
        let html = r#"
          <span id="productTitle" class="a-size-extra-large">
            Dune (Dune Chronicles, Book 1)
          </span>
          <span class="author notFaded"><a class="a-link-normal">Frank Herbert</a></span>
          <img id="landingImage" src="https://m.media-amazon.com/images/I/81zN7udGRUL.jpg" />
          <div id="bookDescription_feature_div"><span>Set on the desert planet Arrakis.</span></div>
          <span class="a-text-bold">Publisher &#8207; : &#8207;</span> <span>Ace; Reissue edition (June 1, 1990)</span>
          <span class="a-text-bold">Language :</span> <span>English</span>
          <span class="a-text-bold">Mass Market Paperback :</span> <span>896 pages</span>
          <span class="a-text-bold">ISBN-10 :</span> <span>0441172717</span>
          <span class="a-text-bold">ISBN-13 :</span> <span>978-0441172719</span>
          <span id="acrCustomerReviewText" class="a-size-base">41,432 ratings</span>
        "#;

        let result = AmazonProvider::parse_product_page("0441172717", html).unwrap();
        assert_eq!(result.title.as_deref(), Some("Dune"));
        assert_eq!(result.series_name.as_deref(), Some("Dune Chronicles"));
        assert_eq!(result.series_number, Some(1.0));
        assert_eq!(result.authors, vec!["Frank Herbert"]);
        assert_eq!(result.publisher.as_deref(), Some("Ace; Reissue edition"));
        assert_eq!(result.publish_year, Some(1990));
        assert_eq!(result.language.as_deref(), Some("English"));
        assert_eq!(result.page_count, Some(896));
        assert_eq!(result.isbn10.as_deref(), Some("0441172717"));
        assert_eq!(result.isbn13.as_deref(), Some("9780441172719"));
        assert_eq!(result.rating_count, Some(41_432));
        assert_eq!(
            result.description.as_deref(),
            Some("Set on the desert planet Arrakis.")
        );
    }

    #[test]
    fn test_parse_product_page_without_title_is_none() {
        assert!(AmazonProvider::parse_product_page("X", "<html></html>").is_none());
    }

    #[tokio::test]
    async fn test_apply_settings_updates_domain() {
        let provider = AmazonProvider::new(
            reqwest::Client::new(),
            Duration::from_secs(60),
            Duration::from_millis(1),
            "amazon.com".to_string(),
        );

        provider
            .apply_settings(&ProviderSettings {
                domain: Some("amazon.co.uk".into()),
                ..Default::default()
            })
            .await;

        assert_eq!(provider.domain.read().await.as_str(), "amazon.co.uk");
    }
}
