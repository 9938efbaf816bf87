//! In-memory TTL cache
//!
//! Shared by the provider adapters (response caching) and the import session
//! stores. Entries carry their creation instant; expiry is enforced both on
//! access and by an optional periodic sweep task, so an idle process does not
//! accumulate dead entries.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

/// Map from key to value with a fixed time-to-live per cache instance.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a key. An expired entry is removed and reported as absent.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value, resetting the TTL for that key.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove a key, returning its value only while still fresh.
    ///
    /// Removal is unconditional, so a caller that takes an entry owns it
    /// exclusively: a second `remove` (or `get`) of the same key finds nothing.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(key)?;
        if entry.created_at.elapsed() < self.ttl {
            Some(entry.value)
        } else {
            None
        }
    }

    /// Drop all expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
        before - entries.len()
    }

    /// Number of entries currently held, including not-yet-purged expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Spawn a background task that purges expired entries every `period`.
    ///
    /// The task runs until the process exits; the returned handle is only
    /// needed by tests that want to abort it.
    pub fn start_sweep_task(
        self: Arc<Self>,
        label: &'static str,
        period: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; consume it so the first
            // real sweep happens one full period after startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    debug!(cache = label, removed, "Swept expired cache entries");
                }
            }
        })
    }
}
