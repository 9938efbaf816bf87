use crate::api::models::{BestMatchResponse, MetadataQuery};
use crate::core::error::{BookshelfError, Result};
use crate::core::isbn::{is_valid_isbn, normalize_isbn};
use crate::providers::{BookMetadataResult, MetadataSearchRequest, ProviderSettings};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::collections::{BTreeMap, HashMap};
use super::AppState;

/// Per-provider result cap when the client does not send one.
const DEFAULT_SEARCH_LIMIT: usize = 10;
/// Upper bound on the cap; Google Books rejects anything above 40.
const MAX_SEARCH_LIMIT: usize = 40;
/// Shortest accepted title or author query.
const MIN_QUERY_CHARS: usize = 2;

/// Handler for GET /api/metadata/search - fan a search out across providers
///
/// The response body maps provider name to that provider's result list; a
/// provider that failed or found nothing contributes an empty list.
pub async fn search_metadata(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Result<impl IntoResponse> {
    let request = query.search_request();
    validate_search(&request)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let only = query.provider_filter();

    let slots = state.registry.search_all(&request, limit, only.as_deref()).await;
    let results: BTreeMap<String, Vec<BookMetadataResult>> = slots.into_iter().collect();

    Ok(Json(results))
}

/// Handler for GET /api/metadata/best - single best-scored candidate
pub async fn best_match(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Result<impl IntoResponse> {
    let request = query.search_request();
    validate_search(&request)?;

    let response = match state.registry.find_best(&request).await {
        Some(best) => BestMatchResponse {
            result: Some(best.result),
            score: Some(best.score),
        },
        None => BestMatchResponse {
            result: None,
            score: None,
        },
    };

    Ok(Json(response))
}

/// Handler for GET /api/metadata/details/:provider/:id - one provider's
/// detail fetch
pub async fn provider_details(
    State(state): State<AppState>,
    Path((provider, id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let adapter = state
        .registry
        .get(&provider)
        .ok_or_else(|| BookshelfError::ProviderNotFound(provider.clone()))?;

    let details = adapter.fetch_details(&id).await.ok_or_else(|| {
        BookshelfError::NotFound(format!("Provider {} has no details for {}", provider, id))
    })?;

    Ok(Json(details))
}

/// Handler for GET /api/metadata/providers - overviews in priority order
pub async fn list_providers(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.registry.overviews().await))
}

/// Handler for PUT /api/metadata/providers - merge partial settings
///
/// Returns the updated overview list so clients can re-render without a
/// second request.
pub async fn update_providers(
    State(state): State<AppState>,
    Json(settings): Json<HashMap<String, ProviderSettings>>,
) -> Result<impl IntoResponse> {
    state.registry.configure(&settings).await;
    Ok(Json(state.registry.overviews().await))
}

/// Rejects queries too thin to search on. Blank fields have already been
/// dropped by `MetadataQuery::search_request`.
fn validate_search(request: &MetadataSearchRequest) -> Result<()> {
    if request.is_empty() {
        return Err(BookshelfError::ValidationError(
            "Search query must be at least 2 characters".to_string(),
        ));
    }

    for field in [request.title.as_deref(), request.author.as_deref()] {
        if let Some(value) = field {
            if value.chars().count() < MIN_QUERY_CHARS {
                return Err(BookshelfError::ValidationError(
                    "Search query must be at least 2 characters".to_string(),
                ));
            }
        }
    }

    if let Some(isbn) = request.isbn.as_deref() {
        if !is_valid_isbn(&normalize_isbn(isbn)) {
            return Err(BookshelfError::ValidationError(
                "Invalid ISBN format".to_string(),
            ));
        }
    }

    Ok(())
}
