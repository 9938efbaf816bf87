//! Goodreads scraping adapter
//!
//! Goodreads retired its public API, so this adapter scrapes search and book
//! pages. Goodreads has shipped two markup generations (a React app with
//! embedded JSON, and the legacy server-rendered pages); every field is
//! extracted through an ordered chain of patterns so whichever generation we
//! receive, the first matching pattern wins.
//!
//! Requests are paced through [`RequestPacer`]; cache hits skip pacing.

use crate::core::error::{BookshelfError, Result};
use crate::core::text::{clean_html_fragment, collapse_whitespace, decode_html_entities};
use crate::import::series::split_series;
use crate::providers::cache::ResponseCache;
use crate::providers::throttle::RequestPacer;
use crate::providers::types::{BookMetadataResult, MetadataSearchRequest};
use crate::providers::{search_cache_key, MetadataProvider};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

const PROVIDER_NAME: &str = "goodreads";
const SITE_BASE: &str = "https://www.goodreads.com";

lazy_static! {
    // Search result rows
    static ref ROW_BOOK_RE: Regex = Regex::new(
        r#"<a class="bookTitle"[^>]*href="/book/show/(\d+)[^"]*"[^>]*>\s*<span itemprop=['"]name['"][^>]*>([^<]+)</span>"#
    ).unwrap();
    static ref ROW_AUTHOR_RE: Regex = Regex::new(
        r#"<a class="authorName"[^>]*>\s*<span itemprop=['"]name['"][^>]*>([^<]+)</span>"#
    ).unwrap();
    static ref ROW_MINIRATING_RE: Regex =
        Regex::new(r#"(?s)<span class="minirating"[^>]*>(.*?)</span>"#).unwrap();
    static ref ROW_COVER_RE: Regex =
        Regex::new(r#"<img[^>]*class="bookCover"[^>]*src="([^"]+)""#).unwrap();
    static ref ROW_PUBLISHED_RE: Regex = Regex::new(r"published\s+(\d{4})").unwrap();

    static ref AVG_RATING_RE: Regex = Regex::new(r"([\d.]+)\s+avg rating").unwrap();
    static ref RATING_COUNT_TEXT_RE: Regex = Regex::new(r"([\d,]+)\s+ratings?").unwrap();
    static ref COVER_SIZE_SUFFIX_RE: Regex = Regex::new(r"\._S[XY]\d+_").unwrap();

    // Book page, modern markup and embedded JSON
    static ref TITLE_TESTID_RE: Regex =
        Regex::new(r#"<h1[^>]*data-testid="bookTitle"[^>]*>([^<]+)</h1>"#).unwrap();
    static ref TITLE_LEGACY_RE: Regex =
        Regex::new(r#"<h1 id="bookTitle"[^>]*>\s*([^<]+?)\s*</h1>"#).unwrap();
    static ref TITLE_OG_RE: Regex =
        Regex::new(r#"<meta property="og:title" content="([^"]+)""#).unwrap();

    static ref AUTHOR_MODERN_RE: Regex =
        Regex::new(r#"<span class="ContributorLink__name"[^>]*>([^<]+)</span>"#).unwrap();
    static ref AUTHOR_LEGACY_RE: Regex = Regex::new(
        r#"<a class="authorName"[^>]*>\s*<span itemprop=['"]name['"][^>]*>([^<]+)</span>"#
    ).unwrap();
    static ref AUTHOR_JSON_RE: Regex =
        Regex::new(r#""author":\s*\[?\s*\{[^}]*?"name":\s*"([^"]+)""#).unwrap();

    static ref DESCRIPTION_TESTID_RE: Regex =
        Regex::new(r#"(?s)<div data-testid="description"[^>]*>(.+?)</div>"#).unwrap();
    static ref DESCRIPTION_LEGACY_RE: Regex = Regex::new(
        r#"(?s)<div id="description"[^>]*>.*?<span id="freeText[^"]*"[^>]*>(.+?)</span>"#
    ).unwrap();
    static ref DESCRIPTION_OG_RE: Regex =
        Regex::new(r#"<meta property="og:description" content="([^"]+)""#).unwrap();

    static ref ISBN13_JSON_RE: Regex = Regex::new(r#""isbn13":\s*"?(\d{13})"#).unwrap();
    static ref ISBN13_META_RE: Regex =
        Regex::new(r#"<meta property="books:isbn" content="(\d{13})""#).unwrap();
    static ref ISBN13_LABEL_RE: Regex = Regex::new(r"(?s)ISBN13[^\d]{0,40}(\d{13})").unwrap();
    static ref ISBN10_JSON_RE: Regex = Regex::new(r#""isbn":\s*"(\d{9}[0-9X])""#).unwrap();
    static ref ISBN10_LABEL_RE: Regex =
        Regex::new(r"(?s)>ISBN</div>[^\d]{0,100}(\d{9}[0-9X])").unwrap();

    static ref PAGES_JSON_RE: Regex = Regex::new(r#""numPages":\s*(\d+)"#).unwrap();
    static ref PAGES_META_RE: Regex =
        Regex::new(r#"<meta property="books:page_count" content="(\d+)""#).unwrap();
    static ref PAGES_TEXT_RE: Regex = Regex::new(r"(\d+)\s+pages").unwrap();

    static ref YEAR_FIRST_PUBLISHED_RE: Regex =
        Regex::new(r"[Ff]irst published\s+[A-Za-z]+\s+\d{1,2},?\s+(\d{4})").unwrap();
    static ref YEAR_PUBLISHED_RE: Regex =
        Regex::new(r"[Pp]ublished\s+(?:[A-Za-z]+\s+\d{1,2},?\s+)?(\d{4})").unwrap();

    static ref COVER_MODERN_RE: Regex =
        Regex::new(r#"<img[^>]*class="ResponsiveImage"[^>]*src="([^"]+)""#).unwrap();
    static ref COVER_OG_RE: Regex =
        Regex::new(r#"<meta property="og:image" content="([^"]+)""#).unwrap();
    static ref COVER_LEGACY_RE: Regex =
        Regex::new(r#"<img[^>]*id="coverImage"[^>]*src="([^"]+)""#).unwrap();

    static ref RATING_JSON_RE: Regex = Regex::new(r#""averageRating":\s*([\d.]+)"#).unwrap();
    static ref RATING_LEGACY_RE: Regex =
        Regex::new(r#"(?s)itemprop="ratingValue"[^>]*>\s*([\d.]+)"#).unwrap();
    static ref RATING_COUNT_JSON_RE: Regex = Regex::new(r#""ratingsCount":\s*(\d+)"#).unwrap();

    static ref GENRE_JSON_RE: Regex = Regex::new(r#""genre":\{"name":"([^"]+)""#).unwrap();
    static ref GENRE_LEGACY_RE: Regex = Regex::new(
        r#"<a class="actionLinkLite bookPageGenreLink" href="/genres/[^"]*">([^<]+)</a>"#
    ).unwrap();

    // Ordered fallback chains, newest markup first
    static ref TITLE_CHAIN: Vec<&'static Regex> =
        vec![&TITLE_TESTID_RE, &TITLE_LEGACY_RE, &TITLE_OG_RE];
    static ref AUTHOR_CHAIN: Vec<&'static Regex> =
        vec![&AUTHOR_MODERN_RE, &AUTHOR_LEGACY_RE, &AUTHOR_JSON_RE];
    static ref DESCRIPTION_CHAIN: Vec<&'static Regex> =
        vec![&DESCRIPTION_TESTID_RE, &DESCRIPTION_LEGACY_RE, &DESCRIPTION_OG_RE];
    static ref ISBN13_CHAIN: Vec<&'static Regex> =
        vec![&ISBN13_JSON_RE, &ISBN13_META_RE, &ISBN13_LABEL_RE];
    static ref ISBN10_CHAIN: Vec<&'static Regex> = vec![&ISBN10_JSON_RE, &ISBN10_LABEL_RE];
    static ref PAGES_CHAIN: Vec<&'static Regex> =
        vec![&PAGES_JSON_RE, &PAGES_META_RE, &PAGES_TEXT_RE];
    static ref YEAR_CHAIN: Vec<&'static Regex> =
        vec![&YEAR_FIRST_PUBLISHED_RE, &YEAR_PUBLISHED_RE];
    static ref COVER_CHAIN: Vec<&'static Regex> =
        vec![&COVER_MODERN_RE, &COVER_OG_RE, &COVER_LEGACY_RE];
    static ref RATING_CHAIN: Vec<&'static Regex> = vec![&RATING_JSON_RE, &RATING_LEGACY_RE];
    static ref RATING_COUNT_CHAIN: Vec<&'static Regex> =
        vec![&RATING_COUNT_JSON_RE, &RATING_COUNT_TEXT_RE];
    static ref GENRE_CHAIN: Vec<&'static Regex> = vec![&GENRE_JSON_RE, &GENRE_LEGACY_RE];
}

const MAX_GENRES: usize = 6;

pub struct GoodreadsProvider {
    client: reqwest::Client,
    cache: ResponseCache,
    pacer: RequestPacer,
}

impl GoodreadsProvider {
    pub fn new(client: reqwest::Client, cache_ttl: Duration, min_request_interval: Duration) -> Self {
        Self {
            client,
            cache: ResponseCache::new(cache_ttl),
            pacer: RequestPacer::new(min_request_interval),
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

        let response = self
            .client
            .get(format!("{SITE_BASE}/search"))
            .query(&[("q", query.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Goodreads search returned HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(Self::parse_search_page(&html, limit))
    }

    async fn fetch_upstream(&self, book_id: &str) -> Result<Option<BookMetadataResult>> {
        self.pacer.pace().await;

        let response = self
            .client
            .get(format!("{SITE_BASE}/book/show/{book_id}"))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BookshelfError::UpstreamError(format!(
                "Goodreads book page returned HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(Self::parse_book_page(book_id, &html))
    }

    /// Extracts result rows from a search page. Rows without a book link are
    /// skipped.
    fn parse_search_page(html: &str, limit: usize) -> Vec<BookMetadataResult> {
        let mut results = Vec::new();

        for row in html.split(r#"itemtype="http://schema.org/Book""#).skip(1) {
            if results.len() >= limit {
                break;
            }

            let Some(link) = ROW_BOOK_RE.captures(row) else {
                continue;
            };

            let mut result = BookMetadataResult::new(PROVIDER_NAME);
            result.provider_id = Some(link[1].to_string());

            let raw_title = collapse_whitespace(&decode_html_entities(&link[2]));
            let (title, series) = split_series(&raw_title);
            result.title = Some(title);
            if let Some(series) = series {
                result.series_name = Some(series.name);
                result.series_number = Some(series.number);
            }

            if let Some(caps) = ROW_AUTHOR_RE.captures(row) {
                result.authors = vec![collapse_whitespace(&decode_html_entities(&caps[1]))];
            }

            if let Some(caps) = ROW_MINIRATING_RE.captures(row) {
                let text = decode_html_entities(&caps[1]);
                result.rating = AVG_RATING_RE
                    .captures(&text)
                    .and_then(|c| c[1].parse().ok());
                result.rating_count = RATING_COUNT_TEXT_RE
                    .captures(&text)
                    .and_then(|c| c[1].replace(',', "").parse().ok());
            }

            result.publish_year = ROW_PUBLISHED_RE
                .captures(row)
                .and_then(|c| c[1].parse().ok());

            if let Some(caps) = ROW_COVER_RE.captures(row) {
                let thumb = caps[1].to_string();
                result.cover_url = Some(COVER_SIZE_SUFFIX_RE.replace_all(&thumb, "").to_string());
                result.thumbnail_url = Some(thumb);
            }

            results.push(result);
        }

        results
    }

    /// Extracts book details through the fallback chains. A page that yields
    /// no title is treated as unparseable.
    fn parse_book_page(book_id: &str, html: &str) -> Option<BookMetadataResult> {
        let raw_title = first_capture(html, &TITLE_CHAIN)?;
        let (title, series) = split_series(&collapse_whitespace(&decode_html_entities(&raw_title)));

        let mut result = BookMetadataResult::new(PROVIDER_NAME);
        result.provider_id = Some(book_id.to_string());
        result.title = Some(title);
        if let Some(series) = series {
            result.series_name = Some(series.name);
            result.series_number = Some(series.number);
        }

        result.authors = all_captures(html, &AUTHOR_CHAIN, 5)
            .into_iter()
            .map(|author| collapse_whitespace(&decode_html_entities(&author)))
            .collect();

        result.description = first_capture(html, &DESCRIPTION_CHAIN)
            .map(|fragment| clean_html_fragment(&fragment))
            .filter(|text| !text.is_empty());

        result.isbn13 = first_capture(html, &ISBN13_CHAIN);
        result.isbn10 = first_capture(html, &ISBN10_CHAIN);
        result.page_count = first_capture(html, &PAGES_CHAIN).and_then(|p| p.parse().ok());
        result.publish_year = first_capture(html, &YEAR_CHAIN).and_then(|y| y.parse().ok());
        result.cover_url = first_capture(html, &COVER_CHAIN).map(|url| decode_html_entities(&url));
        result.rating = first_capture(html, &RATING_CHAIN).and_then(|r| r.parse().ok());
        result.rating_count = first_capture(html, &RATING_COUNT_CHAIN)
            .and_then(|c| c.replace(',', "").parse().ok());

        result.genres = all_captures(html, &GENRE_CHAIN, MAX_GENRES)
            .into_iter()
            .map(|genre| decode_html_entities(&genre))
            .collect();

        Some(result)
    }
}

#[async_trait]
impl MetadataProvider for GoodreadsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Goodreads"
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

/// Tries each pattern in order; the first capture wins.
fn first_capture(html: &str, chain: &[&Regex]) -> Option<String> {
    chain.iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

/// Collects every capture of the first pattern in the chain that matches at
/// all, deduplicated and capped.
fn all_captures(html: &str, chain: &[&Regex], cap: usize) -> Vec<String> {
    for re in chain.iter() {
        let mut found: Vec<String> = Vec::new();
        for caps in re.captures_iter(html) {
            if let Some(m) = caps.get(1) {
                let value = m.as_str().trim().to_string();
                if !value.is_empty() && !found.contains(&value) {
                    found.push(value);
                }
            }
            if found.len() >= cap {
                break;
            }
        }
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_ROW: &str = r#"
      <tr itemscope itemtype="http://schema.org/Book">
        <td><img alt="The Way of Kings" class="bookCover" itemprop="image"
             src="https://i.gr-assets.com/images/S/books/1659905828i/7235533._SY75_.jpg" /></td>
        <td>
          <a class="bookTitle" itemprop="url" href="/book/show/7235533-the-way-of-kings?from_search=true">
            <span itemprop='name' role='heading' aria-level='4'>The Way of Kings (The Stormlight Archive, #1)</span>
          </a>
          <a class="authorName" itemprop="url" href="/author/show/38550"><span itemprop='name'>Brandon Sanderson</span></a>
          <span class="minirating">4.65 avg rating &mdash; 512,366 ratings</span>
          &mdash; published 2010
        </td>
      </tr>"#;

    #[test]
    fn test_parse_search_page() {
        let results = GoodreadsProvider::parse_search_page(SEARCH_ROW, 5);
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert_eq!(result.provider_id.as_deref(), Some("7235533"));
        assert_eq!(result.title.as_deref(), Some("The Way of Kings"));
        assert_eq!(result.series_name.as_deref(), Some("The Stormlight Archive"));
        assert_eq!(result.series_number, Some(1.0));
        assert_eq!(result.authors, vec!["Brandon Sanderson"]);
        assert_eq!(result.rating, Some(4.65));
        assert_eq!(result.rating_count, Some(512_366));
        assert_eq!(result.publish_year, Some(2010));
        assert_eq!(
            result.cover_url.as_deref(),
            Some("https://i.gr-assets.com/images/S/books/1659905828i/7235533.jpg")
        );
    }

    #[test]
    fn test_parse_search_page_respects_limit() {
        let two_rows = format!("{SEARCH_ROW}{SEARCH_ROW}");
        assert_eq!(GoodreadsProvider::parse_search_page(&two_rows, 1).len(), 1);
    }

    #[test]
    fn test_parse_book_page_modern_markup() {
        let html = r#"
          <h1 data-testid="bookTitle">Dune</h1>
          <span class="ContributorLink__name">Frank Herbert</span>
          <div data-testid="description">Set on the desert planet Arrakis &amp; beyond.</div>
          <script>{"isbn":"0441172717","isbn13":"9780441172719","numPages":412,
                   "averageRating":4.27,"ratingsCount":1234567,
                   "bookGenres":[{"genre":{"name":"Science Fiction"}},{"genre":{"name":"Classics"}}]}</script>
          <meta property="og:image" content="https://images.gr-assets.com/books/1555447414l/234225.jpg" />
          <p>First published June 1, 1965</p>
        "#;

        let result = GoodreadsProvider::parse_book_page("234225", html).unwrap();
        assert_eq!(result.title.as_deref(), Some("Dune"));
        assert_eq!(result.authors, vec!["Frank Herbert"]);
        assert_eq!(
            result.description.as_deref(),
            Some("Set on the desert planet Arrakis & beyond.")
        );
        assert_eq!(result.isbn10.as_deref(), Some("0441172717"));
        assert_eq!(result.isbn13.as_deref(), Some("9780441172719"));
        assert_eq!(result.page_count, Some(412));
        assert_eq!(result.publish_year, Some(1965));
        assert_eq!(result.rating, Some(4.27));
        assert_eq!(result.rating_count, Some(1_234_567));
        assert_eq!(result.genres, vec!["Science Fiction", "Classics"]);
    }

    #[test]
    fn test_parse_book_page_legacy_markup() {
        let html = r#"
          <h1 id="bookTitle" class="gr-h1 gr-h1--serif" itemprop="name">
            The Blade Itself
          </h1>
          <a class="authorName" itemprop="url" href="/author/show/276660"><span itemprop="name">Joe Abercrombie</span></a>
          <div id="description" class="readable stacked">
            <span id="freeText12345" style="display:none">Logen Ninefingers is a barbarian.</span>
          </div>
          <div class="infoBoxRowTitle">ISBN</div>
          <div class="infoBoxRowItem">0575079797 <span class="greyText">(ISBN13: 9780575079793)</span></div>
          <span itemprop="numberOfPages">515 pages</span>
          <img id="coverImage" src="https://images.gr-assets.com/books/1284167912l/944073.jpg" />
        "#;

        let result = GoodreadsProvider::parse_book_page("944073", html).unwrap();
        assert_eq!(result.title.as_deref(), Some("The Blade Itself"));
        assert_eq!(result.authors, vec!["Joe Abercrombie"]);
        assert_eq!(
            result.description.as_deref(),
            Some("Logen Ninefingers is a barbarian.")
        );
        assert_eq!(result.isbn10.as_deref(), Some("0575079797"));
        assert_eq!(result.isbn13.as_deref(), Some("9780575079793"));
        assert_eq!(result.page_count, Some(515));
    }

    #[test]
    fn test_chain_order_prefers_modern_markup() {
        let html = r#"
          <meta property="og:title" content="Wrong Title" />
          <h1 data-testid="bookTitle">Right Title</h1>
        "#;
        let result = GoodreadsProvider::parse_book_page("1", html).unwrap();
        assert_eq!(result.title.as_deref(), Some("Right Title"));
    }

    #[test]
    fn test_unparseable_page_yields_none() {
        assert!(GoodreadsProvider::parse_book_page("1", "<html><body>captcha</body></html>").is_none());
    }

    #[test]
    fn test_build_query_prefers_isbn() {
        let request = MetadataSearchRequest {
            title: Some("Dune".into()),
            author: Some("Herbert".into()),
            isbn: Some("978-0-441-17271-9".into()),
        };
        assert_eq!(GoodreadsProvider::build_query(&request), "9780441172719");
    }
}
