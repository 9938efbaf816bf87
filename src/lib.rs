//! BookShelf Backend Library
//!
//! This library provides the core functionality for the BookShelf backend:
//! metadata aggregation across external book providers, library import
//! reconciliation, SQLite persistence and the REST API service.

pub mod api;
pub mod cache;
pub mod core;
pub mod db;
pub mod import;
pub mod providers;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::Config;
pub use db::DatabaseManager;
pub use import::{ImportExecutor, ImportSessionStore};
pub use providers::ProviderRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for the library
pub type Result<T> = anyhow::Result<T>;
