//! HTTP server
//!
//! Axum server wiring: routes, CORS, request tracing, upload size limits
//! and graceful shutdown.

use crate::api::handlers::AppState;
use crate::api::middleware::trace_id_middleware;
use crate::api::routes::build_api_routes;
use crate::core::config::{Config, ServerConfig};
use crate::db::DatabaseManager;
use crate::import::{ImportExecutor, ImportSessionStore};
use crate::providers::ProviderRegistry;
use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server over the shared application services.
    pub fn new(
        config: &Config,
        db: Arc<DatabaseManager>,
        registry: Arc<ProviderRegistry>,
        sessions: Arc<ImportSessionStore>,
        executor: Arc<ImportExecutor>,
    ) -> Self {
        let state = AppState {
            db,
            registry,
            sessions,
            executor,
        };
        let router = Self::build_router(state, config.import.max_upload_mb);

        Self {
            router,
            config: config.server.clone(),
        }
    }

    /// Build the Axum router with all routes and middleware
    fn build_router(state: AppState, max_upload_mb: u64) -> Router {
        let max_upload_bytes = (max_upload_mb as usize).saturating_mul(1024 * 1024);

        build_api_routes(state).layer(
            ServiceBuilder::new()
                // Trace ID middleware runs outermost so the span covers
                // everything below it
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(Self::build_cors_layer())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
    }

    /// The backend is served to browsers from wherever the frontend happens
    /// to be hosted, so CORS stays open.
    fn build_cors_layer() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");

        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}
