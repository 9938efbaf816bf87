//! Repository pattern implementation for data access layer
//!
//! One repository per entity, each a thin async wrapper over the shared
//! connection pool. Lookups used by import resolution are case-insensitive
//! so re-imports do not multiply authors that differ only in casing.

use crate::core::error::{BookshelfError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Author, Book, BookCandidate, Format, Genre, NewBook, Series, Status};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use uuid::Uuid;

fn map_author(row: &Row) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn map_series(row: &Row) -> rusqlite::Result<Series> {
    Ok(Series {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn map_status(row: &Row) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get(0)?,
        key: row.get(1)?,
        label: row.get(2)?,
    })
}

fn map_genre(row: &Row) -> rusqlite::Result<Genre> {
    Ok(Genre {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn map_format(row: &Row) -> rusqlite::Result<Format> {
    Ok(Format {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

const BOOK_COLUMNS: &str = "id, title, subtitle, isbn10, isbn13, goodreads_id, author_id, \
     series_id, series_number, status_id, genre_id, format_id, page_count, publish_year, \
     rating, date_read, date_added, description, cover_url, created_at";

fn map_book(row: &Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        isbn10: row.get(3)?,
        isbn13: row.get(4)?,
        goodreads_id: row.get(5)?,
        author_id: row.get(6)?,
        series_id: row.get(7)?,
        series_number: row.get(8)?,
        status_id: row.get(9)?,
        genre_id: row.get(10)?,
        format_id: row.get(11)?,
        page_count: row.get(12)?,
        publish_year: row.get(13)?,
        rating: row.get(14)?,
        date_read: row.get(15)?,
        date_added: row.get(16)?,
        description: row.get(17)?,
        cover_url: row.get(18)?,
        created_at: row.get(19)?,
    })
}

/// Repository for Author entities
pub struct AuthorRepository {
    db: Arc<DatabaseManager>,
}

impl AuthorRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// All authors ordered by name, the comparison set for fuzzy matching
    pub async fn find_all(&self) -> Result<Vec<Author>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, name, created_at FROM authors ORDER BY name")
                    .map_err(BookshelfError::DatabaseError)?;

                let authors = stmt
                    .query_map([], map_author)
                    .map_err(BookshelfError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BookshelfError::DatabaseError)?;

                Ok(authors)
            })
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Author>> {
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name, created_at FROM authors WHERE name = ? COLLATE NOCASE",
                    [&name],
                    map_author,
                )
                .optional()
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }

    pub async fn create(&self, name: &str) -> Result<Author> {
        let id = Uuid::new_v4().to_string();
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO authors (id, name) VALUES (?, ?)",
                    params![id, name],
                )
                .map_err(BookshelfError::DatabaseError)?;

                conn.query_row(
                    "SELECT id, name, created_at FROM authors WHERE id = ?",
                    [&id],
                    map_author,
                )
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }
}

/// Repository for Series entities
pub struct SeriesRepository {
    db: Arc<DatabaseManager>,
}

impl SeriesRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> Result<Vec<Series>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, title, created_at FROM series ORDER BY title")
                    .map_err(BookshelfError::DatabaseError)?;

                let series = stmt
                    .query_map([], map_series)
                    .map_err(BookshelfError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BookshelfError::DatabaseError)?;

                Ok(series)
            })
            .await
    }

    pub async fn find_by_title(&self, title: &str) -> Result<Option<Series>> {
        let title = title.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, title, created_at FROM series WHERE title = ? COLLATE NOCASE",
                    [&title],
                    map_series,
                )
                .optional()
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }

    pub async fn create(&self, title: &str) -> Result<Series> {
        let id = Uuid::new_v4().to_string();
        let title = title.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO series (id, title) VALUES (?, ?)",
                    params![id, title],
                )
                .map_err(BookshelfError::DatabaseError)?;

                conn.query_row(
                    "SELECT id, title, created_at FROM series WHERE id = ?",
                    [&id],
                    map_series,
                )
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }
}

/// Repository for reading statuses (seeded, lookup only)
pub struct StatusRepository {
    db: Arc<DatabaseManager>,
}

impl StatusRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> Result<Vec<Status>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, key, label FROM statuses")
                    .map_err(BookshelfError::DatabaseError)?;

                let statuses = stmt
                    .query_map([], map_status)
                    .map_err(BookshelfError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BookshelfError::DatabaseError)?;

                Ok(statuses)
            })
            .await
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<Status>> {
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, key, label FROM statuses WHERE key = ?",
                    [&key],
                    map_status,
                )
                .optional()
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }
}

/// Repository for Genre entities (created on demand during imports)
pub struct GenreRepository {
    db: Arc<DatabaseManager>,
}

impl GenreRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> Result<Vec<Genre>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, name FROM genres ORDER BY name")
                    .map_err(BookshelfError::DatabaseError)?;

                let genres = stmt
                    .query_map([], map_genre)
                    .map_err(BookshelfError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BookshelfError::DatabaseError)?;

                Ok(genres)
            })
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name FROM genres WHERE name = ? COLLATE NOCASE",
                    [&name],
                    map_genre,
                )
                .optional()
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }

    pub async fn create(&self, name: &str) -> Result<Genre> {
        let id = Uuid::new_v4().to_string();
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO genres (id, name) VALUES (?, ?)",
                    params![id, name],
                )
                .map_err(BookshelfError::DatabaseError)?;

                conn.query_row(
                    "SELECT id, name FROM genres WHERE id = ?",
                    [&id],
                    map_genre,
                )
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }
}

/// Repository for Format entities (seeded with common bindings, created on
/// demand for anything else)
pub struct FormatRepository {
    db: Arc<DatabaseManager>,
}

impl FormatRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> Result<Vec<Format>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, name FROM formats ORDER BY name")
                    .map_err(BookshelfError::DatabaseError)?;

                let formats = stmt
                    .query_map([], map_format)
                    .map_err(BookshelfError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BookshelfError::DatabaseError)?;

                Ok(formats)
            })
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Format>> {
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name FROM formats WHERE name = ? COLLATE NOCASE",
                    [&name],
                    map_format,
                )
                .optional()
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }

    pub async fn create(&self, name: &str) -> Result<Format> {
        let id = Uuid::new_v4().to_string();
        let name = name.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO formats (id, name) VALUES (?, ?)",
                    params![id, name],
                )
                .map_err(BookshelfError::DatabaseError)?;

                conn.query_row(
                    "SELECT id, name FROM formats WHERE id = ?",
                    [&id],
                    map_format,
                )
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }
}

/// Repository for Book entities
pub struct BookRepository {
    db: Arc<DatabaseManager>,
}

impl BookRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Insert a new book, returning its generated id
    pub async fn create(&self, book: NewBook) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let returned_id = id.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO books (id, title, subtitle, isbn10, isbn13, goodreads_id, \
                     author_id, series_id, series_number, status_id, genre_id, format_id, \
                     page_count, publish_year, rating, date_read, date_added, description, \
                     cover_url) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        id,
                        book.title,
                        book.subtitle,
                        book.isbn10,
                        book.isbn13,
                        book.goodreads_id,
                        book.author_id,
                        book.series_id,
                        book.series_number,
                        book.status_id,
                        book.genre_id,
                        book.format_id,
                        book.page_count,
                        book.publish_year,
                        book.rating,
                        book.date_read,
                        book.date_added,
                        book.description,
                        book.cover_url,
                    ],
                )
                .map_err(BookshelfError::DatabaseError)?;

                Ok(id)
            })
            .await?;

        Ok(returned_id)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Book>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS),
                    [&id],
                    map_book,
                )
                .optional()
                .map_err(BookshelfError::DatabaseError)
            })
            .await
    }

    /// The identity slice of every book, joined with author names, used as
    /// the duplicate-detection comparison set during imports
    pub async fn candidates(&self) -> Result<Vec<BookCandidate>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT b.id, b.title, a.name, b.isbn10, b.isbn13, b.goodreads_id \
                         FROM books b LEFT JOIN authors a ON a.id = b.author_id",
                    )
                    .map_err(BookshelfError::DatabaseError)?;

                let candidates = stmt
                    .query_map([], |row| {
                        Ok(BookCandidate {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            author_name: row.get(2)?,
                            isbn10: row.get(3)?,
                            isbn13: row.get(4)?,
                            goodreads_id: row.get(5)?,
                        })
                    })
                    .map_err(BookshelfError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(BookshelfError::DatabaseError)?;

                Ok(candidates)
            })
            .await
    }

    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute(|conn| {
                conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
                    .map_err(BookshelfError::DatabaseError)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Arc<DatabaseManager> {
        Arc::new(DatabaseManager::new_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_author_create_and_lookup() {
        let db = test_db();
        let authors = AuthorRepository::new(db);

        let created = authors.create("Brandon Sanderson").await.unwrap();
        assert!(!created.id.is_empty());

        let found = authors.find_by_name("brandon sanderson").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(created.id));

        assert!(authors.find_by_name("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_author_find_all_is_sorted() {
        let db = test_db();
        let authors = AuthorRepository::new(db);

        authors.create("Ursula K. Le Guin").await.unwrap();
        authors.create("Ann Leckie").await.unwrap();

        let all = authors.find_all().await.unwrap();
        let names: Vec<&str> = all.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Ann Leckie", "Ursula K. Le Guin"]);
    }

    #[tokio::test]
    async fn test_series_create_and_lookup() {
        let db = test_db();
        let series = SeriesRepository::new(db);

        let created = series.create("The Stormlight Archive").await.unwrap();
        let found = series
            .find_by_title("the stormlight archive")
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_status_lookup_by_key() {
        let db = test_db();
        let statuses = StatusRepository::new(db);

        let current = statuses.find_by_key("current").await.unwrap().unwrap();
        assert_eq!(current.label, "Currently Reading");

        assert!(statuses.find_by_key("abandoned").await.unwrap().is_none());
        assert_eq!(statuses.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_seeded_formats_and_genre_create() {
        let db = test_db();
        let formats = FormatRepository::new(db.clone());
        let genres = GenreRepository::new(db);

        assert!(formats.find_by_name("Audiobook").await.unwrap().is_some());
        assert!(formats.find_by_name("audiobook").await.unwrap().is_some());

        assert!(genres.find_by_name("Fantasy").await.unwrap().is_none());
        let created = genres.create("Fantasy").await.unwrap();
        let found = genres.find_by_name("fantasy").await.unwrap();
        assert_eq!(found.map(|g| g.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_book_create_roundtrip() {
        let db = test_db();
        let authors = AuthorRepository::new(db.clone());
        let books = BookRepository::new(db);

        let author = authors.create("Frank Herbert").await.unwrap();

        let id = books
            .create(NewBook {
                title: "Dune".to_string(),
                isbn13: Some("9780441172719".to_string()),
                author_id: Some(author.id.clone()),
                series_number: Some(1.0),
                page_count: Some(412),
                publish_year: Some(1965),
                rating: Some(4.5),
                ..NewBook::default()
            })
            .await
            .unwrap();

        let book = books.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.isbn13.as_deref(), Some("9780441172719"));
        assert_eq!(book.author_id, Some(author.id));
        assert_eq!(book.page_count, Some(412));
        assert!(!book.created_at.is_empty());

        assert_eq!(books.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_candidates_join_author_names() {
        let db = test_db();
        let authors = AuthorRepository::new(db.clone());
        let books = BookRepository::new(db);

        assert!(books.candidates().await.unwrap().is_empty());

        let author = authors.create("Frank Herbert").await.unwrap();
        books
            .create(NewBook {
                title: "Dune".to_string(),
                author_id: Some(author.id),
                goodreads_id: Some("234225".to_string()),
                ..NewBook::default()
            })
            .await
            .unwrap();
        books
            .create(NewBook {
                title: "Orphan Work".to_string(),
                ..NewBook::default()
            })
            .await
            .unwrap();

        let candidates = books.candidates().await.unwrap();
        assert_eq!(candidates.len(), 2);

        let dune = candidates.iter().find(|c| c.title == "Dune").unwrap();
        assert_eq!(dune.author_name.as_deref(), Some("Frank Herbert"));
        assert_eq!(dune.goodreads_id.as_deref(), Some("234225"));

        let orphan = candidates.iter().find(|c| c.title == "Orphan Work").unwrap();
        assert!(orphan.author_name.is_none());
    }
}
