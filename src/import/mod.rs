//! Import reconciliation engine
//!
//! Turns uploaded library exports (generic CSV, Goodreads CSV, Audible HTML)
//! into normalized rows, annotates them against the existing catalog (fuzzy
//! author/series matches, duplicate detection), parks the annotated batch in
//! a time-limited session for human review, and finally writes the approved
//! rows through the repository layer.
//!
//! Parsing and matching are pure; only the executor touches the database.

pub mod annotate;
pub mod audible;
pub mod csv;
pub mod dates;
pub mod dedup;
pub mod executor;
pub mod matching;
pub mod series;
pub mod session;

pub use executor::{ImportExecutor, ImportOutcome};
pub use session::ImportSessionStore;

use serde::{Deserialize, Serialize};

/// A fuzzy match against an existing catalog record, surfaced in the preview
/// so the user can see what a row will be linked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub id: String,
    pub name: String,
    /// Similarity scaled to 0..=100
    pub confidence: u32,
    pub exact: bool,
}

/// One normalized row from an uploaded CSV, with its resolution state.
///
/// Raw fields come straight out of the file; the `*_match`/`*_id` fields are
/// filled in by annotation and consumed by the executor on commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBook {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn10: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goodreads_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_number: Option<f64>,
    /// Internal status key (`read`, `current`, `next`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Normalized to `YYYY-MM-DD`; empty input dates are dropped entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_read: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_match: Option<MatchInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_match: Option<MatchInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_book_id: Option<String>,
}

/// One row scraped from an uploaded Audible library page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudibleBook {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_match: Option<MatchInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_book_id: Option<String>,
}
