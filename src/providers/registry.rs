//! Provider registry and result aggregation
//!
//! Owns one instance of every adapter behind `Arc<dyn MetadataProvider>`,
//! tracks which are enabled and in what priority order, fans searches out
//! concurrently and scores candidates for best-match lookups. Settings
//! updates are merged in place and propagated to the adapters immediately.

use crate::core::config::ProvidersConfig;
use crate::providers::amazon::AmazonProvider;
use crate::providers::comic_vine::ComicVineProvider;
use crate::providers::google_books::GoogleBooksProvider;
use crate::providers::goodreads::GoodreadsProvider;
use crate::providers::hardcover::HardcoverProvider;
use crate::providers::open_library::OpenLibraryProvider;
use crate::providers::types::{
    BestMatch, BookMetadataResult, MetadataSearchRequest, ProviderOverview, ProviderSettings,
};
use crate::providers::MetadataProvider;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// How many results to request per provider when aggregating a best match.
const BEST_MATCH_LIMIT: usize = 5;

#[derive(Debug, Clone, Default)]
struct ProviderState {
    enabled: bool,
    priority: u32,
}

pub struct ProviderRegistry {
    /// Registration order breaks priority ties, so it is kept stable.
    providers: Vec<Arc<dyn MetadataProvider>>,
    states: RwLock<HashMap<String, ProviderState>>,
}

impl ProviderRegistry {
    pub fn new(client: reqwest::Client, config: &ProvidersConfig) -> Self {
        let cache_ttl = Duration::from_secs(config.cache_ttl_secs);

        let providers: Vec<Arc<dyn MetadataProvider>> = vec![
            Arc::new(GoogleBooksProvider::new(client.clone(), cache_ttl)),
            Arc::new(OpenLibraryProvider::new(client.clone(), cache_ttl)),
            Arc::new(GoodreadsProvider::new(
                client.clone(),
                cache_ttl,
                Duration::from_millis(config.goodreads.min_request_interval_ms),
            )),
            Arc::new(AmazonProvider::new(
                client.clone(),
                cache_ttl,
                Duration::from_millis(config.amazon.min_request_interval_ms),
                config.amazon.domain.clone(),
            )),
            Arc::new(ComicVineProvider::new(
                client.clone(),
                cache_ttl,
                non_empty(&config.comicvine.api_key),
            )),
            Arc::new(HardcoverProvider::new(
                client,
                cache_ttl,
                non_empty(&config.hardcover.api_token),
            )),
        ];

        let states = HashMap::from([
            (
                "google_books".to_string(),
                ProviderState {
                    enabled: config.google_books.enabled,
                    priority: config.google_books.priority,
                },
            ),
            (
                "open_library".to_string(),
                ProviderState {
                    enabled: config.open_library.enabled,
                    priority: config.open_library.priority,
                },
            ),
            (
                "goodreads".to_string(),
                ProviderState {
                    enabled: config.goodreads.enabled,
                    priority: config.goodreads.priority,
                },
            ),
            (
                "amazon".to_string(),
                ProviderState {
                    enabled: config.amazon.enabled,
                    priority: config.amazon.priority,
                },
            ),
            (
                "comicvine".to_string(),
                ProviderState {
                    enabled: config.comicvine.enabled,
                    priority: config.comicvine.priority,
                },
            ),
            (
                "hardcover".to_string(),
                ProviderState {
                    enabled: config.hardcover.enabled,
                    priority: config.hardcover.priority,
                },
            ),
        ]);

        Self::assemble(providers, states)
    }

    fn assemble(
        providers: Vec<Arc<dyn MetadataProvider>>,
        states: HashMap<String, ProviderState>,
    ) -> Self {
        Self {
            providers,
            states: RwLock::new(states),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MetadataProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.name() == name)
            .cloned()
    }

    /// Merges partial settings into the registry and pushes credential and
    /// domain changes into the adapters.
    pub async fn configure(&self, settings: &HashMap<String, ProviderSettings>) {
        for (name, update) in settings {
            let Some(provider) = self.get(name) else {
                tracing::warn!(provider = %name, "Ignoring settings for unknown provider");
                continue;
            };

            {
                let mut states = self.states.write().await;
                if let Some(state) = states.get_mut(name.as_str()) {
                    if let Some(enabled) = update.enabled {
                        state.enabled = enabled;
                    }
                    if let Some(priority) = update.priority {
                        state.priority = priority;
                    }
                }
            }

            provider.apply_settings(update).await;
            tracing::info!(provider = %name, "Provider settings updated");
        }
    }

    /// Enabled providers in ascending priority order. The sort is stable, so
    /// equal priorities keep registration order.
    pub async fn enabled_providers(&self) -> Vec<Arc<dyn MetadataProvider>> {
        let states = self.states.read().await;
        let mut enabled: Vec<(u32, Arc<dyn MetadataProvider>)> = self
            .providers
            .iter()
            .filter_map(|provider| {
                let state = states.get(provider.name())?;
                if state.enabled {
                    Some((state.priority, provider.clone()))
                } else {
                    None
                }
            })
            .collect();

        enabled.sort_by_key(|(priority, _)| *priority);
        enabled.into_iter().map(|(_, provider)| provider).collect()
    }

    /// Every registered provider with its current state, for settings UIs.
    pub async fn overviews(&self) -> Vec<ProviderOverview> {
        let states = self.states.read().await.clone();

        let mut overviews = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let state = states.get(provider.name()).cloned().unwrap_or_default();
            overviews.push(ProviderOverview {
                name: provider.name().to_string(),
                display_name: provider.display_name().to_string(),
                enabled: state.enabled,
                priority: state.priority,
                requires_auth: provider.requires_auth(),
                available: provider.is_available().await,
            });
        }

        overviews.sort_by_key(|overview| overview.priority);
        overviews
    }

    /// Fans the search out across enabled providers concurrently. Each slot
    /// holds whatever its provider produced; a provider that failed inside
    /// contributes an empty list, never an error.
    ///
    /// Slots come back in provider priority order.
    pub async fn search_all(
        &self,
        request: &MetadataSearchRequest,
        limit: usize,
        only: Option<&[String]>,
    ) -> Vec<(String, Vec<BookMetadataResult>)> {
        let mut providers = self.enabled_providers().await;
        if let Some(names) = only {
            providers.retain(|provider| names.iter().any(|name| name == provider.name()));
        }

        let searches = providers.into_iter().map(|provider| {
            let request = request.clone();
            async move {
                let results = provider.search(&request, limit).await;
                (provider.name().to_string(), results)
            }
        });

        join_all(searches).await
    }

    /// Aggregates a small search across all enabled providers and returns the
    /// highest-scoring candidate, or `None` when nothing came back.
    pub async fn find_best(&self, request: &MetadataSearchRequest) -> Option<BestMatch> {
        let mut best: Option<BestMatch> = None;

        for (_, results) in self.search_all(request, BEST_MATCH_LIMIT, None).await {
            for result in results {
                let score = score_result(&result, request);
                // Strict comparison keeps the earliest candidate on ties
                if best.as_ref().map_or(true, |current| score > current.score) {
                    best = Some(BestMatch { score, result });
                }
            }
        }

        best
    }
}

/// Scores one candidate against the request.
///
/// Identity signals dominate: an exact ISBN match outweighs a perfect title
/// plus every completeness bonus combined. Completeness bonuses then order
/// otherwise-equal candidates by how much useful metadata they carry.
pub fn score_result(result: &BookMetadataResult, request: &MetadataSearchRequest) -> i32 {
    let mut score = 0;

    if let (Some(wanted), Some(found)) = (request.title.as_deref(), result.title.as_deref()) {
        let wanted = wanted.trim().to_lowercase();
        let found = found.trim().to_lowercase();
        if !wanted.is_empty() && !found.is_empty() {
            if wanted == found {
                score += 100;
            } else if found.contains(&wanted) || wanted.contains(&found) {
                score += 50;
            }
        }
    }

    if let Some(author) = request.author.as_deref() {
        let wanted = author.trim().to_lowercase();
        if !wanted.is_empty()
            && result
                .authors
                .iter()
                .any(|candidate| candidate.to_lowercase().contains(&wanted))
        {
            score += 30;
        }
    }

    if let Some(isbn) = request.normalized_isbn() {
        if result.isbn13.as_deref() == Some(isbn.as_str())
            || result.isbn10.as_deref() == Some(isbn.as_str())
        {
            score += 200;
        }
    }

    if result.description.as_deref().map_or(false, |d| !d.is_empty()) {
        score += 10;
    }
    if result.cover_url.is_some() {
        score += 15;
    }
    if result.page_count.is_some() {
        score += 5;
    }
    if result.publish_year.is_some() {
        score += 5;
    }
    if !result.genres.is_empty() {
        score += 5;
    }
    if result.rating.is_some() {
        score += 5;
    }
    if result.series_name.is_some() {
        score += 5;
    }

    score
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct StubProvider {
        name: &'static str,
        results: Vec<BookMetadataResult>,
        applied: Mutex<Vec<ProviderSettings>>,
    }

    impl StubProvider {
        fn new(name: &'static str, results: Vec<BookMetadataResult>) -> Arc<Self> {
            Arc::new(Self {
                name,
                results,
                applied: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MetadataProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn display_name(&self) -> &'static str {
            self.name
        }

        async fn apply_settings(&self, settings: &ProviderSettings) {
            self.applied.lock().await.push(settings.clone());
        }

        async fn search(
            &self,
            _request: &MetadataSearchRequest,
            limit: usize,
        ) -> Vec<BookMetadataResult> {
            self.results.iter().take(limit).cloned().collect()
        }

        async fn fetch_details(&self, provider_id: &str) -> Option<BookMetadataResult> {
            self.results
                .iter()
                .find(|r| r.provider_id.as_deref() == Some(provider_id))
                .cloned()
        }
    }

    fn result_from(provider: &str, title: &str) -> BookMetadataResult {
        let mut result = BookMetadataResult::new(provider);
        result.title = Some(title.to_string());
        result
    }

    fn registry_of(entries: Vec<(Arc<StubProvider>, bool, u32)>) -> ProviderRegistry {
        let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();
        let mut states = HashMap::new();
        for (provider, enabled, priority) in entries {
            states.insert(
                provider.name().to_string(),
                ProviderState { enabled, priority },
            );
            providers.push(provider);
        }
        ProviderRegistry::assemble(providers, states)
    }

    fn title_request(title: &str) -> MetadataSearchRequest {
        MetadataSearchRequest {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_enabled_providers_sorted_by_priority() {
        let registry = registry_of(vec![
            (StubProvider::new("third", vec![]), true, 30),
            (StubProvider::new("first", vec![]), true, 10),
            (StubProvider::new("second", vec![]), true, 20),
            (StubProvider::new("disabled", vec![]), false, 1),
        ]);

        let names: Vec<&str> = registry
            .enabled_providers()
            .await
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_search_all_keeps_empty_slot_for_barren_provider() {
        let registry = registry_of(vec![
            (
                StubProvider::new("healthy", vec![result_from("healthy", "Dune")]),
                true,
                1,
            ),
            (StubProvider::new("broken", vec![]), true, 2),
        ]);

        let slots = registry.search_all(&title_request("Dune"), 5, None).await;
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].0, "healthy");
        assert_eq!(slots[0].1.len(), 1);
        assert_eq!(slots[1].0, "broken");
        assert!(slots[1].1.is_empty());
    }

    #[tokio::test]
    async fn test_search_all_honors_provider_filter() {
        let registry = registry_of(vec![
            (
                StubProvider::new("alpha", vec![result_from("alpha", "Dune")]),
                true,
                1,
            ),
            (
                StubProvider::new("beta", vec![result_from("beta", "Dune")]),
                true,
                2,
            ),
        ]);

        let only = vec!["beta".to_string()];
        let slots = registry
            .search_all(&title_request("Dune"), 5, Some(&only))
            .await;
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].0, "beta");
    }

    #[tokio::test]
    async fn test_configure_updates_state_and_propagates_settings() {
        let stub = StubProvider::new("alpha", vec![]);
        let registry = registry_of(vec![(stub.clone(), true, 1)]);

        let mut settings = HashMap::new();
        settings.insert(
            "alpha".to_string(),
            ProviderSettings {
                enabled: Some(false),
                priority: Some(9),
                api_key: Some("key".into()),
                domain: None,
            },
        );
        registry.configure(&settings).await;

        assert!(registry.enabled_providers().await.is_empty());
        let applied = stub.applied.lock().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].api_key.as_deref(), Some("key"));
    }

    #[tokio::test]
    async fn test_configure_ignores_unknown_provider() {
        let registry = registry_of(vec![(StubProvider::new("alpha", vec![]), true, 1)]);

        let mut settings = HashMap::new();
        settings.insert("nonexistent".to_string(), ProviderSettings::default());
        registry.configure(&settings).await;

        assert_eq!(registry.enabled_providers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_best_prefers_isbn_match_over_rich_title_match() {
        // A perfect title with every completeness bonus still scores 150,
        // below a bare ISBN match at 200
        let mut rich = result_from("alpha", "The Hobbit");
        rich.description = Some("A fine book.".into());
        rich.cover_url = Some("https://example.com/c.jpg".into());
        rich.page_count = Some(310);
        rich.publish_year = Some(1937);
        rich.genres = vec!["Fantasy".into()];
        rich.rating = Some(4.5);
        rich.series_name = Some("Middle-earth".into());

        let mut isbn_only = result_from("beta", "Completely Different");
        isbn_only.isbn13 = Some("9780547928227".into());

        let registry = registry_of(vec![
            (StubProvider::new("alpha", vec![rich]), true, 1),
            (StubProvider::new("beta", vec![isbn_only]), true, 2),
        ]);

        let request = MetadataSearchRequest {
            title: Some("The Hobbit".into()),
            author: None,
            isbn: Some("978-0-547-92822-7".into()),
        };
        let best = registry.find_best(&request).await.unwrap();
        assert_eq!(best.result.provider, "beta");
        assert_eq!(best.score, 200);
    }

    #[tokio::test]
    async fn test_find_best_tie_keeps_first_encountered() {
        let registry = registry_of(vec![
            (
                StubProvider::new("alpha", vec![result_from("alpha", "Dune")]),
                true,
                1,
            ),
            (
                StubProvider::new("beta", vec![result_from("beta", "Dune")]),
                true,
                2,
            ),
        ]);

        let best = registry.find_best(&title_request("Dune")).await.unwrap();
        assert_eq!(best.result.provider, "alpha");
    }

    #[tokio::test]
    async fn test_find_best_with_no_results_is_none() {
        let registry = registry_of(vec![(StubProvider::new("alpha", vec![]), true, 1)]);
        assert!(registry.find_best(&title_request("Dune")).await.is_none());
    }

    #[test]
    fn test_score_result_title_tiers() {
        let request = title_request("The Hobbit");

        let exact = result_from("x", "The Hobbit");
        assert_eq!(score_result(&exact, &request), 100);

        let superset = result_from("x", "The Hobbit: Or There and Back Again");
        assert_eq!(score_result(&superset, &request), 50);

        let unrelated = result_from("x", "A Game of Thrones");
        assert_eq!(score_result(&unrelated, &request), 0);
    }

    #[test]
    fn test_score_result_author_and_completeness() {
        let request = MetadataSearchRequest {
            title: Some("The Hobbit".into()),
            author: Some("Tolkien".into()),
            isbn: None,
        };

        let mut result = result_from("x", "The Hobbit");
        result.authors = vec!["J.R.R. Tolkien".into()];
        result.description = Some("There and back again.".into());
        result.cover_url = Some("https://example.com/c.jpg".into());

        // 100 title + 30 author + 10 description + 15 cover
        assert_eq!(score_result(&result, &request), 155);
    }

    #[test]
    fn test_score_result_matches_isbn10_too() {
        let request = MetadataSearchRequest {
            title: None,
            author: None,
            isbn: Some("0-547-92822-X".into()),
        };

        let mut result = result_from("x", "Whatever");
        result.isbn10 = Some("054792822X".into());
        assert_eq!(score_result(&result, &request), 200);
    }
}
