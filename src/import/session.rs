//! Import session store
//!
//! Parsed previews wait here, keyed by a generated session id, until the
//! user commits or the TTL runs out. `take_*` removes the entry while
//! returning it, so a session can be committed exactly once; a repeat commit
//! (or one after expiry) simply finds nothing.

use crate::cache::TtlCache;
use crate::core::config::ImportConfig;
use crate::import::{AudibleBook, ParsedBook};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

pub struct ImportSessionStore {
    csv: Arc<TtlCache<String, Vec<ParsedBook>>>,
    audible: Arc<TtlCache<String, Vec<AudibleBook>>>,
}

impl ImportSessionStore {
    pub fn new(config: &ImportConfig) -> Self {
        Self::with_ttls(
            Duration::from_secs(config.csv_session_ttl_secs),
            Duration::from_secs(config.audible_session_ttl_secs),
        )
    }

    pub fn with_ttls(csv_ttl: Duration, audible_ttl: Duration) -> Self {
        Self {
            csv: Arc::new(TtlCache::new(csv_ttl)),
            audible: Arc::new(TtlCache::new(audible_ttl)),
        }
    }

    /// Park a parsed CSV preview, returning its session id.
    pub async fn store_csv(&self, rows: Vec<ParsedBook>) -> String {
        let session_id = Uuid::new_v4().to_string();
        debug!(session_id = %session_id, rows = rows.len(), "Stored CSV import session");
        self.csv.insert(session_id.clone(), rows).await;
        session_id
    }

    /// Claim a CSV session for commit. Exclusive: a second call with the
    /// same id returns `None`, as does any call after expiry.
    pub async fn take_csv(&self, session_id: &str) -> Option<Vec<ParsedBook>> {
        self.csv.remove(&session_id.to_string()).await
    }

    pub async fn store_audible(&self, rows: Vec<AudibleBook>) -> String {
        let session_id = Uuid::new_v4().to_string();
        debug!(session_id = %session_id, rows = rows.len(), "Stored Audible import session");
        self.audible.insert(session_id.clone(), rows).await;
        session_id
    }

    pub async fn take_audible(&self, session_id: &str) -> Option<Vec<AudibleBook>> {
        self.audible.remove(&session_id.to_string()).await
    }

    /// Start the periodic sweep tasks that delete expired sessions even when
    /// no request touches the store.
    pub fn spawn_sweepers(&self, period: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.csv.clone().start_sweep_task("csv-sessions", period),
            self.audible
                .clone()
                .start_sweep_task("audible-sessions", period),
        ]
    }
}
