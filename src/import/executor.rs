//! Import executor
//!
//! Writes an approved selection of parsed rows through the repository layer.
//! The batch is best-effort, one sequential insert per row: a failing row
//! lands in `errors` and the rest continue. Duplicate flags are advisory;
//! a selected row is written even when the preview marked it a duplicate.

use crate::core::error::Result;
use crate::db::models::NewBook;
use crate::db::{
    AuthorRepository, BookRepository, DatabaseManager, FormatRepository, GenreRepository,
    SeriesRepository, StatusRepository,
};
use crate::import::{AudibleBook, ParsedBook};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const AUDIOBOOK_FORMAT: &str = "Audiobook";

/// One failed row inside an otherwise-continuing commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub title: String,
    pub error: String,
}

/// What a commit did: rows written, rows left out of the selection, and
/// per-row failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

pub struct ImportExecutor {
    authors: AuthorRepository,
    series: SeriesRepository,
    statuses: StatusRepository,
    genres: GenreRepository,
    formats: FormatRepository,
    books: BookRepository,
}

impl ImportExecutor {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self {
            authors: AuthorRepository::new(db.clone()),
            series: SeriesRepository::new(db.clone()),
            statuses: StatusRepository::new(db.clone()),
            genres: GenreRepository::new(db.clone()),
            formats: FormatRepository::new(db.clone()),
            books: BookRepository::new(db),
        }
    }

    /// Write the selected CSV rows. `create_missing` controls whether unknown
    /// authors and series are created; genres and formats are always created
    /// on demand, and statuses are lookup-only.
    pub async fn commit_csv(
        &self,
        rows: Vec<ParsedBook>,
        selected: &[usize],
        create_missing: bool,
    ) -> ImportOutcome {
        let (indices, mut errors) = normalize_selection(selected, rows.len());
        let skipped = rows.len() - indices.len();
        let mut imported = 0;

        for index in indices {
            let row = &rows[index];
            match self.write_csv_row(row, create_missing).await {
                Ok(()) => imported += 1,
                Err(e) => errors.push(RowError {
                    row: index,
                    title: row.title.clone(),
                    error: e.to_string(),
                }),
            }
        }

        info!(imported, skipped, failed = errors.len(), "CSV import committed");
        ImportOutcome {
            imported,
            skipped,
            errors,
        }
    }

    /// Write the selected Audible rows. Every row gets the `Audiobook`
    /// format; series resolution follows `create_missing` like CSV rows.
    pub async fn commit_audible(
        &self,
        rows: Vec<AudibleBook>,
        selected: &[usize],
        create_missing: bool,
    ) -> ImportOutcome {
        let (indices, mut errors) = normalize_selection(selected, rows.len());
        let skipped = rows.len() - indices.len();
        let mut imported = 0;

        for index in indices {
            let row = &rows[index];
            match self.write_audible_row(row, create_missing).await {
                Ok(()) => imported += 1,
                Err(e) => errors.push(RowError {
                    row: index,
                    title: row.title.clone(),
                    error: e.to_string(),
                }),
            }
        }

        info!(imported, skipped, failed = errors.len(), "Audible import committed");
        ImportOutcome {
            imported,
            skipped,
            errors,
        }
    }

    async fn write_csv_row(&self, row: &ParsedBook, create_missing: bool) -> Result<()> {
        require_title(&row.title)?;

        let author_id = self
            .resolve_author(row.author_id.as_deref(), row.author.as_deref(), create_missing)
            .await?;
        let series_id = self
            .resolve_series(
                row.series_id.as_deref(),
                row.series_name.as_deref(),
                create_missing,
            )
            .await?;
        let status_id = self
            .resolve_status(row.status_id.as_deref(), row.status.as_deref())
            .await?;
        let genre_id = self
            .resolve_genre(row.genre_id.as_deref(), row.genre.as_deref())
            .await?;
        let format_id = self
            .resolve_format(row.format_id.as_deref(), row.format.as_deref())
            .await?;

        self.books
            .create(NewBook {
                title: row.title.trim().to_string(),
                isbn10: row.isbn10.clone(),
                isbn13: row.isbn13.clone(),
                goodreads_id: row.goodreads_id.clone(),
                author_id,
                series_id,
                series_number: row.series_number,
                status_id,
                genre_id,
                format_id,
                page_count: row.page_count,
                publish_year: row.publish_year,
                rating: row.rating,
                date_read: row.date_read.clone(),
                date_added: row.date_added.clone(),
                ..NewBook::default()
            })
            .await?;
        Ok(())
    }

    async fn write_audible_row(&self, row: &AudibleBook, create_missing: bool) -> Result<()> {
        require_title(&row.title)?;

        let author_id = self
            .resolve_author(row.author_id.as_deref(), row.author.as_deref(), create_missing)
            .await?;
        let series_id = self
            .resolve_series(None, row.series_name.as_deref(), create_missing)
            .await?;
        let format_id = self.resolve_format(None, Some(AUDIOBOOK_FORMAT)).await?;

        self.books
            .create(NewBook {
                title: row.title.trim().to_string(),
                author_id,
                series_id,
                series_number: row.series_number,
                format_id,
                cover_url: row.cover_url.clone(),
                ..NewBook::default()
            })
            .await?;
        Ok(())
    }

    async fn resolve_author(
        &self,
        resolved: Option<&str>,
        name: Option<&str>,
        create_missing: bool,
    ) -> Result<Option<String>> {
        if let Some(id) = resolved {
            return Ok(Some(id.to_string()));
        }
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if let Some(author) = self.authors.find_by_name(name).await? {
            return Ok(Some(author.id));
        }
        if create_missing {
            return Ok(Some(self.authors.create(name).await?.id));
        }
        Ok(None)
    }

    async fn resolve_series(
        &self,
        resolved: Option<&str>,
        title: Option<&str>,
        create_missing: bool,
    ) -> Result<Option<String>> {
        if let Some(id) = resolved {
            return Ok(Some(id.to_string()));
        }
        let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        if let Some(series) = self.series.find_by_title(title).await? {
            return Ok(Some(series.id));
        }
        if create_missing {
            return Ok(Some(self.series.create(title).await?.id));
        }
        Ok(None)
    }

    async fn resolve_status(
        &self,
        resolved: Option<&str>,
        key: Option<&str>,
    ) -> Result<Option<String>> {
        if let Some(id) = resolved {
            return Ok(Some(id.to_string()));
        }
        let Some(key) = key else {
            return Ok(None);
        };
        Ok(self.statuses.find_by_key(key).await?.map(|status| status.id))
    }

    async fn resolve_genre(
        &self,
        resolved: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<String>> {
        if let Some(id) = resolved {
            return Ok(Some(id.to_string()));
        }
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if let Some(genre) = self.genres.find_by_name(name).await? {
            return Ok(Some(genre.id));
        }
        Ok(Some(self.genres.create(name).await?.id))
    }

    async fn resolve_format(
        &self,
        resolved: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<String>> {
        if let Some(id) = resolved {
            return Ok(Some(id.to_string()));
        }
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if let Some(format) = self.formats.find_by_name(name).await? {
            return Ok(Some(format.id));
        }
        Ok(Some(self.formats.create(name).await?.id))
    }
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(crate::core::error::BookshelfError::ValidationError(
            "Row has no title".to_string(),
        ));
    }
    Ok(())
}

/// Valid selection indices in ascending order with duplicates removed;
/// out-of-range indices become row errors without touching the database.
fn normalize_selection(selected: &[usize], total: usize) -> (Vec<usize>, Vec<RowError>) {
    let mut indices: Vec<usize> = Vec::new();
    let mut errors = Vec::new();

    for &index in selected {
        if index >= total {
            errors.push(RowError {
                row: index,
                title: String::new(),
                error: "Row index out of range".to_string(),
            });
        } else {
            indices.push(index);
        }
    }

    indices.sort_unstable();
    indices.dedup();
    (indices, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BookCandidate;

    fn test_setup() -> (ImportExecutor, Arc<DatabaseManager>) {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        (ImportExecutor::new(db.clone()), db)
    }

    fn csv_row(title: &str, author: Option<&str>) -> ParsedBook {
        ParsedBook {
            title: title.to_string(),
            author: author.map(str::to_string),
            ..ParsedBook::default()
        }
    }

    async fn find_candidate(db: &Arc<DatabaseManager>, title: &str) -> BookCandidate {
        BookRepository::new(db.clone())
            .candidates()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.title == title)
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_creates_catalog_entries() {
        let (executor, db) = test_setup();

        let rows = vec![ParsedBook {
            title: "The Way of Kings".to_string(),
            author: Some("Brandon Sanderson".to_string()),
            series_name: Some("The Stormlight Archive".to_string()),
            series_number: Some(1.0),
            status: Some("current".to_string()),
            genre: Some("Fantasy".to_string()),
            format: Some("Hardcover".to_string()),
            isbn13: Some("9780765326355".to_string()),
            page_count: Some(1007),
            publish_year: Some(2010),
            rating: Some(5.0),
            date_read: Some("2023-01-15".to_string()),
            ..ParsedBook::default()
        }];

        let outcome = executor.commit_csv(rows, &[0], true).await;
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.errors.is_empty());

        let candidate = find_candidate(&db, "The Way of Kings").await;
        assert_eq!(candidate.author_name.as_deref(), Some("Brandon Sanderson"));

        let book = BookRepository::new(db.clone())
            .find_by_id(&candidate.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(book.status_id.as_deref(), Some("status-current"));
        assert!(book.series_id.is_some());
        assert!(book.genre_id.is_some());
        assert_eq!(book.series_number, Some(1.0));
        assert_eq!(book.date_read.as_deref(), Some("2023-01-15"));

        assert!(SeriesRepository::new(db.clone())
            .find_by_title("The Stormlight Archive")
            .await
            .unwrap()
            .is_some());
        assert!(GenreRepository::new(db)
            .find_by_name("Fantasy")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unselected_rows_are_skipped() {
        let (executor, db) = test_setup();
        let rows = vec![
            csv_row("Book A", None),
            csv_row("Book B", None),
            csv_row("Book C", None),
        ];

        let outcome = executor.commit_csv(rows, &[1], true).await;
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(BookRepository::new(db).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_missing_false_leaves_author_unlinked() {
        let (executor, db) = test_setup();
        let rows = vec![csv_row("Elantris", Some("Brandon Sanderson"))];

        let outcome = executor.commit_csv(rows, &[0], false).await;
        assert_eq!(outcome.imported, 1);

        let candidate = find_candidate(&db, "Elantris").await;
        assert!(candidate.author_name.is_none());
        assert!(AuthorRepository::new(db)
            .find_by_name("Brandon Sanderson")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_existing_author_is_linked_without_create_missing() {
        let (executor, db) = test_setup();
        AuthorRepository::new(db.clone())
            .create("Brandon Sanderson")
            .await
            .unwrap();

        let rows = vec![csv_row("Elantris", Some("Brandon Sanderson"))];
        executor.commit_csv(rows, &[0], false).await;

        let candidate = find_candidate(&db, "Elantris").await;
        assert_eq!(candidate.author_name.as_deref(), Some("Brandon Sanderson"));
    }

    #[tokio::test]
    async fn test_out_of_range_selection_is_reported() {
        let (executor, db) = test_setup();
        let rows = vec![csv_row("Book A", None)];

        let outcome = executor.commit_csv(rows, &[0, 7], true).await;
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 7);
        assert_eq!(outcome.errors[0].error, "Row index out of range");
        assert_eq!(BookRepository::new(db).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_titleless_row_fails_without_stopping_batch() {
        let (executor, db) = test_setup();
        let rows = vec![csv_row("  ", None), csv_row("Book B", None)];

        let outcome = executor.commit_csv(rows, &[0, 1], true).await;
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 0);
        assert_eq!(BookRepository::new(db).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_flag_is_advisory() {
        let (executor, db) = test_setup();
        let rows = vec![ParsedBook {
            title: "The Way of Kings".to_string(),
            is_duplicate: true,
            duplicate_book_id: Some("some-existing-id".to_string()),
            ..ParsedBook::default()
        }];

        // The user selected it anyway, so it is written.
        let outcome = executor.commit_csv(rows, &[0], true).await;
        assert_eq!(outcome.imported, 1);
        assert_eq!(BookRepository::new(db).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_selection_indices_write_once() {
        let (executor, db) = test_setup();
        let rows = vec![csv_row("Book A", None)];

        let outcome = executor.commit_csv(rows, &[0, 0, 0], true).await;
        assert_eq!(outcome.imported, 1);
        assert_eq!(BookRepository::new(db).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_audible_commit_uses_audiobook_format() {
        let (executor, db) = test_setup();
        let rows = vec![AudibleBook {
            title: "The Way of Kings".to_string(),
            author: Some("Brandon Sanderson".to_string()),
            series_name: Some("The Stormlight Archive".to_string()),
            series_number: Some(1.0),
            cover_url: Some("https://m.media-amazon.com/images/I/x.jpg".to_string()),
            ..AudibleBook::default()
        }];

        let outcome = executor.commit_audible(rows, &[0], true).await;
        assert_eq!(outcome.imported, 1);

        let candidate = find_candidate(&db, "The Way of Kings").await;
        let book = BookRepository::new(db.clone())
            .find_by_id(&candidate.id)
            .await
            .unwrap()
            .unwrap();

        // The seeded Audiobook format is reused, not duplicated
        assert_eq!(book.format_id.as_deref(), Some("format-audiobook"));
        assert!(book.cover_url.is_some());
        assert!(book.series_id.is_some());
        assert_eq!(FormatRepository::new(db).find_all().await.unwrap().len(), 4);
    }
}
