use crate::import::csv::CsvFormat;
use crate::import::{AudibleBook, ParsedBook};
use serde::{Deserialize, Serialize};

/// Preview returned from a CSV upload: the annotated rows plus the session
/// id the client must present on commit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvPreviewResponse {
    pub session_id: String,
    pub format: CsvFormat,
    pub total_rows: usize,
    pub books: Vec<ParsedBook>,
}

/// Preview returned from an Audible library upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudiblePreviewResponse {
    pub session_id: String,
    pub total_rows: usize,
    pub books: Vec<AudibleBook>,
}

/// Commit request for both import kinds. `selected_rows` are indexes into
/// the previewed batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub session_id: String,
    #[serde(default)]
    pub selected_rows: Vec<usize>,
    #[serde(default = "default_create_missing")]
    pub create_missing: bool,
}

fn default_create_missing() -> bool {
    true
}
