pub mod import;
pub mod metadata;
pub mod system;

pub use import::*;
pub use metadata::*;
pub use system::*;

use crate::db::DatabaseManager;
use crate::import::{ImportExecutor, ImportSessionStore};
use crate::providers::ProviderRegistry;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub registry: Arc<ProviderRegistry>,
    pub sessions: Arc<ImportSessionStore>,
    pub executor: Arc<ImportExecutor>,
}
