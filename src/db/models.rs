//! Database models
//!
//! Data structures representing database tables

use serde::{Deserialize, Serialize};

/// Author record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// Series record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub title: String,
    pub created_at: String,
}

/// Reading status record. The `key` values (`read`, `current`, `next`) are
/// stable identifiers used by imports; `label` is the display text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub key: String,
    pub label: String,
}

/// Genre record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
}

/// Format (binding) record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub id: String,
    pub name: String,
}

/// Book record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub goodreads_id: Option<String>,
    pub author_id: Option<String>,
    pub series_id: Option<String>,
    pub series_number: Option<f64>,
    pub status_id: Option<String>,
    pub genre_id: Option<String>,
    pub format_id: Option<String>,
    pub page_count: Option<u32>,
    pub publish_year: Option<i32>,
    pub rating: Option<f64>,
    pub date_read: Option<String>,
    pub date_added: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: String,
}

/// Fields for inserting a new book. The repository assigns the id and the
/// database assigns the creation timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub goodreads_id: Option<String>,
    pub author_id: Option<String>,
    pub series_id: Option<String>,
    pub series_number: Option<f64>,
    pub status_id: Option<String>,
    pub genre_id: Option<String>,
    pub format_id: Option<String>,
    pub page_count: Option<u32>,
    pub publish_year: Option<i32>,
    pub rating: Option<f64>,
    pub date_read: Option<String>,
    pub date_added: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// The identity slice of an existing book, joined with its author name, used
/// as the comparison set for duplicate detection during imports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCandidate {
    pub id: String,
    pub title: String,
    pub author_name: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub goodreads_id: Option<String>,
}
