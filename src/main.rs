//! BookShelf Backend
//!
//! A book collection tracker backend: metadata aggregation across external
//! providers and CSV/Audible library imports.

use bookshelf::{api, core, db, import, providers};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("Starting BookShelf Backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        path = ?config.database.path,
        "Database configuration"
    );

    // Initialize database (runs migrations)
    info!("Initializing database...");
    let db = Arc::new(db::DatabaseManager::new(
        &config.database.path,
        config.database.connection_pool_size as u32,
        Duration::from_millis(config.database.busy_timeout),
    )?);
    info!("Database initialized successfully");

    // One HTTP client shared by every provider adapter
    let client = reqwest::Client::builder()
        .user_agent(format!("BookShelf/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.providers.request_timeout_secs))
        .build()?;

    let registry = Arc::new(providers::ProviderRegistry::new(client, &config.providers));

    // Import sessions expire in the background, decoupled from uploads
    let sessions = Arc::new(import::ImportSessionStore::new(&config.import));
    sessions.spawn_sweepers(Duration::from_secs(config.import.sweep_interval_secs));

    let executor = Arc::new(import::ImportExecutor::new(db.clone()));

    // Initialize API server
    info!("Initializing HTTP server...");
    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(&config, db, registry, sessions, executor);

    info!("BookShelf Backend initialized successfully");
    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}
