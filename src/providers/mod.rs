//! Metadata provider aggregation
//!
//! Six external book-metadata sources sit behind one trait: two JSON APIs
//! (Google Books, Open Library), two scraped retail/community sites
//! (Goodreads, Amazon) and two credentialed APIs (ComicVine, Hardcover).
//! The [`ProviderRegistry`] owns the adapters, fans searches out across the
//! enabled ones and scores candidates for best-match lookups.
//!
//! Adapters never surface errors to callers. A failed search logs and yields
//! an empty list; a failed detail fetch logs and yields `None`. That keeps
//! one flaky upstream from poisoning an aggregated response.

pub mod amazon;
pub mod cache;
pub mod comic_vine;
pub mod google_books;
pub mod goodreads;
pub mod hardcover;
pub mod open_library;
pub mod registry;
pub mod throttle;
pub mod types;

pub use registry::ProviderRegistry;
pub use types::{
    BestMatch, BookMetadataResult, MetadataSearchRequest, ProviderOverview, ProviderSettings,
};

use crate::core::isbn::normalize_isbn;
use async_trait::async_trait;

/// Uniform contract every metadata source implements.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Stable machine name, used as registry key and in API paths.
    fn name(&self) -> &'static str;

    /// Human-readable name for settings UIs.
    fn display_name(&self) -> &'static str;

    /// Whether this source needs a credential before it can serve requests.
    fn requires_auth(&self) -> bool {
        false
    }

    /// Whether the source can currently serve requests. For credentialed
    /// sources this reflects key presence, not key validity.
    async fn is_available(&self) -> bool {
        true
    }

    /// Applies runtime settings (credentials, domain). Providers without
    /// adjustable state ignore this.
    async fn apply_settings(&self, _settings: &ProviderSettings) {}

    /// Searches the source. Never fails: upstream or parse errors are logged
    /// and yield an empty list.
    async fn search(&self, request: &MetadataSearchRequest, limit: usize)
        -> Vec<BookMetadataResult>;

    /// Fetches full details for a provider-native id. `None` means the id is
    /// unknown to the source or the fetch failed (which is logged).
    async fn fetch_details(&self, provider_id: &str) -> Option<BookMetadataResult>;
}

/// Cache key covering every request field that affects a search response.
pub(crate) fn search_cache_key(request: &MetadataSearchRequest, limit: usize) -> String {
    format!(
        "{}|{}|{}|{}",
        request
            .title
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase(),
        request
            .author
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase(),
        request.isbn.as_deref().map(normalize_isbn).unwrap_or_default(),
        limit
    )
}
