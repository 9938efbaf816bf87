//! Per-provider response caching
//!
//! Each adapter owns one `ResponseCache`. A cache hit short-circuits the whole
//! request path, including pacing for scraped sources, so repeated lookups of
//! the same book cost nothing upstream.

use crate::cache::TtlCache;
use crate::providers::types::BookMetadataResult;
use std::time::Duration;

pub struct ResponseCache {
    searches: TtlCache<String, Vec<BookMetadataResult>>,
    details: TtlCache<String, Option<BookMetadataResult>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            searches: TtlCache::new(ttl),
            details: TtlCache::new(ttl),
        }
    }

    pub async fn get_search(&self, key: &str) -> Option<Vec<BookMetadataResult>> {
        self.searches.get(&key.to_string()).await
    }

    pub async fn put_search(&self, key: String, results: Vec<BookMetadataResult>) {
        self.searches.insert(key, results).await;
    }

    /// Outer `Option` is the cache verdict; the inner one is the remembered
    /// answer, which may legitimately be "that id does not exist".
    pub async fn get_details(&self, id: &str) -> Option<Option<BookMetadataResult>> {
        self.details.get(&id.to_string()).await
    }

    pub async fn put_details(&self, id: String, result: Option<BookMetadataResult>) {
        self.details.insert(id, result).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_round_trip() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        assert!(cache.get_search("dune||").await.is_none());

        let results = vec![BookMetadataResult::new("google_books")];
        cache.put_search("dune||".to_string(), results).await;

        let hit = cache.get_search("dune||").await.unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].provider, "google_books");
    }

    #[tokio::test]
    async fn test_details_remembers_misses() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put_details("missing-id".to_string(), None).await;

        // A cached "not found" is a hit, not a cache miss
        assert_eq!(cache.get_details("missing-id").await, Some(None));
        assert_eq!(cache.get_details("never-seen").await, None);
    }
}
