//! Annotation of parsed import rows against the current catalog
//!
//! The upload handlers fetch one `CatalogSnapshot` per request and run every
//! row through it: fuzzy author/series matches, status/genre/format id
//! resolution, duplicate detection. Pure functions over in-memory data; the
//! snapshot is the only thing that touched the database.

use crate::core::error::Result;
use crate::db::models::{Author, BookCandidate, Format, Genre, Series, Status};
use crate::db::{
    AuthorRepository, BookRepository, DatabaseManager, FormatRepository, GenreRepository,
    SeriesRepository, StatusRepository,
};
use crate::import::dedup::find_duplicate;
use crate::import::matching::{match_author, match_series};
use crate::import::{AudibleBook, ParsedBook};
use std::sync::Arc;

/// Everything an upload needs to resolve its rows, fetched once.
pub struct CatalogSnapshot {
    pub authors: Vec<Author>,
    pub series: Vec<Series>,
    pub books: Vec<BookCandidate>,
    pub statuses: Vec<Status>,
    pub genres: Vec<Genre>,
    pub formats: Vec<Format>,
}

impl CatalogSnapshot {
    /// Load the full comparison set from the database.
    pub async fn load(db: &Arc<DatabaseManager>) -> Result<Self> {
        Ok(Self {
            authors: AuthorRepository::new(db.clone()).find_all().await?,
            series: SeriesRepository::new(db.clone()).find_all().await?,
            books: BookRepository::new(db.clone()).candidates().await?,
            statuses: StatusRepository::new(db.clone()).find_all().await?,
            genres: GenreRepository::new(db.clone()).find_all().await?,
            formats: FormatRepository::new(db.clone()).find_all().await?,
        })
    }

    /// An empty snapshot, for tests and for annotating against a fresh catalog.
    pub fn empty() -> Self {
        Self {
            authors: Vec::new(),
            series: Vec::new(),
            books: Vec::new(),
            statuses: Vec::new(),
            genres: Vec::new(),
            formats: Vec::new(),
        }
    }

    pub fn status_id_for_key(&self, key: &str) -> Option<String> {
        self.statuses
            .iter()
            .find(|status| status.key == key)
            .map(|status| status.id.clone())
    }

    pub fn genre_id_for_name(&self, name: &str) -> Option<String> {
        self.genres
            .iter()
            .find(|genre| genre.name.eq_ignore_ascii_case(name))
            .map(|genre| genre.id.clone())
    }

    pub fn format_id_for_name(&self, name: &str) -> Option<String> {
        self.formats
            .iter()
            .find(|format| format.name.eq_ignore_ascii_case(name))
            .map(|format| format.id.clone())
    }
}

/// Resolve every CSV row in place against the snapshot.
pub fn annotate_csv_rows(rows: &mut [ParsedBook], catalog: &CatalogSnapshot) {
    for row in rows.iter_mut() {
        if let Some(author) = row.author.as_deref() {
            if let Some(hit) = match_author(author, &catalog.authors) {
                row.author_id = Some(hit.id.clone());
                row.author_match = Some(hit);
            }
        }

        if let Some(series) = row.series_name.as_deref() {
            if let Some(hit) = match_series(series, &catalog.series) {
                row.series_id = Some(hit.id.clone());
                row.series_match = Some(hit);
            }
        }

        if let Some(status) = row.status.as_deref() {
            row.status_id = catalog.status_id_for_key(status);
        }
        if let Some(genre) = row.genre.as_deref() {
            row.genre_id = catalog.genre_id_for_name(genre);
        }
        if let Some(format) = row.format.as_deref() {
            row.format_id = catalog.format_id_for_name(format);
        }

        let duplicate_id =
            find_duplicate(&row.duplicate_probe(), &catalog.books).map(|book| book.id.clone());
        row.is_duplicate = duplicate_id.is_some();
        row.duplicate_book_id = duplicate_id;
    }
}

/// Resolve every Audible row in place against the snapshot.
pub fn annotate_audible_rows(rows: &mut [AudibleBook], catalog: &CatalogSnapshot) {
    for row in rows.iter_mut() {
        if let Some(author) = row.author.as_deref() {
            if let Some(hit) = match_author(author, &catalog.authors) {
                row.author_id = Some(hit.id.clone());
                row.author_match = Some(hit);
            }
        }

        let duplicate_id =
            find_duplicate(&row.duplicate_probe(), &catalog.books).map(|book| book.id.clone());
        row.is_duplicate = duplicate_id.is_some();
        row.duplicate_book_id = duplicate_id;
    }
}
