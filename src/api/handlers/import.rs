use crate::api::models::{AudiblePreviewResponse, CommitRequest, CsvPreviewResponse};
use crate::core::error::{BookshelfError, Result};
use crate::import::annotate::{annotate_audible_rows, annotate_csv_rows, CatalogSnapshot};
use crate::import::audible::parse_audible_html;
use crate::import::csv::{csv_template, parse_csv};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use super::AppState;

/// Handler for POST /api/import/csv - parse an uploaded CSV into a preview
///
/// Rows are annotated against the current catalog (author/series matches,
/// duplicates) and parked in a session; nothing is written until the client
/// commits.
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let content = read_upload_text(&mut multipart).await?;
    let (format, mut rows) = parse_csv(&content)?;

    let catalog = CatalogSnapshot::load(&state.db).await?;
    annotate_csv_rows(&mut rows, &catalog);

    let session_id = state.sessions.store_csv(rows.clone()).await;

    Ok(Json(CsvPreviewResponse {
        session_id,
        format,
        total_rows: rows.len(),
        books: rows,
    }))
}

/// Handler for PUT /api/import/csv - commit a previewed CSV batch
///
/// The selection is validated before the session is consumed, so an empty
/// request leaves the session intact for a corrected retry. Taking the
/// session is exclusive: a second commit against the same id gets a 404.
pub async fn commit_csv(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Result<impl IntoResponse> {
    if request.selected_rows.is_empty() {
        return Err(BookshelfError::ValidationError(
            "No rows selected for import".to_string(),
        ));
    }

    let rows = state
        .sessions
        .take_csv(&request.session_id)
        .await
        .ok_or(BookshelfError::SessionNotFound)?;

    let outcome = state
        .executor
        .commit_csv(rows, &request.selected_rows, request.create_missing)
        .await;

    Ok(Json(outcome))
}

/// Handler for POST /api/import/audible - parse an uploaded Audible library
/// page into a preview
pub async fn upload_audible(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let content = read_upload_text(&mut multipart).await?;
    let mut rows = parse_audible_html(&content)?;

    let catalog = CatalogSnapshot::load(&state.db).await?;
    annotate_audible_rows(&mut rows, &catalog);

    let session_id = state.sessions.store_audible(rows.clone()).await;

    Ok(Json(AudiblePreviewResponse {
        session_id,
        total_rows: rows.len(),
        books: rows,
    }))
}

/// Handler for PUT /api/import/audible - commit a previewed Audible batch
pub async fn commit_audible(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Result<impl IntoResponse> {
    if request.selected_rows.is_empty() {
        return Err(BookshelfError::ValidationError(
            "No rows selected for import".to_string(),
        ));
    }

    let rows = state
        .sessions
        .take_audible(&request.session_id)
        .await
        .ok_or(BookshelfError::SessionNotFound)?;

    let outcome = state
        .executor
        .commit_audible(rows, &request.selected_rows, request.create_missing)
        .await;

    Ok(Json(outcome))
}

/// Handler for GET /api/import/csv/template - downloadable generic template
pub async fn download_csv_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"bookshelf-import-template.csv\"",
            ),
        ],
        csv_template(),
    )
}

/// Pulls the uploaded file out of the multipart body as text. Accepts the
/// conventional `file` field or any field carrying a filename.
async fn read_upload_text(multipart: &mut Multipart) -> Result<String> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") || field.file_name().is_some() {
            let data = field.bytes().await?;
            return Ok(String::from_utf8_lossy(&data).into_owned());
        }
    }

    Err(BookshelfError::ValidationError(
        "Uploaded file is empty".to_string(),
    ))
}
