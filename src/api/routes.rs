//! API routes

use crate::api::handlers::{
    best_match, commit_audible, commit_csv, download_csv_template, health_check, list_providers,
    provider_details, search_metadata, update_providers, upload_audible, upload_csv, AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the API routes
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Import endpoints: POST uploads a file for preview, PUT commits
        .route("/api/import/csv", post(upload_csv).put(commit_csv))
        .route("/api/import/csv/template", get(download_csv_template))
        .route("/api/import/audible", post(upload_audible).put(commit_audible))
        // Metadata endpoints
        .route("/api/metadata/search", get(search_metadata))
        .route("/api/metadata/best", get(best_match))
        .route("/api/metadata/details/:provider/:id", get(provider_details))
        .route(
            "/api/metadata/providers",
            get(list_providers).put(update_providers),
        )
        .with_state(state)
}
