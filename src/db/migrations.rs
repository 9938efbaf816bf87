//! Database migrations
//!
//! Schema changes are expressed as numbered SQL batches applied in order;
//! the `schema_migrations` table records which versions have run.

use crate::core::error::{BookshelfError, Result};
use rusqlite::Connection;
use tracing::{info, warn};

/// Migration version tracking table
const MIGRATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Initial schema migration (version 1)
const MIGRATION_V1: &str = r#"
-- Authors
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Series
CREATE TABLE IF NOT EXISTS series (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Reading statuses; `key` is the stable identifier imports map shelves onto
CREATE TABLE IF NOT EXISTS statuses (
    id TEXT PRIMARY KEY,
    key TEXT UNIQUE NOT NULL,
    label TEXT NOT NULL
);

-- Genres (created on demand during imports)
CREATE TABLE IF NOT EXISTS genres (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Formats / bindings (created on demand during imports)
CREATE TABLE IF NOT EXISTS formats (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Books
CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    subtitle TEXT,
    isbn10 TEXT,
    isbn13 TEXT,
    goodreads_id TEXT,
    author_id TEXT,
    series_id TEXT,
    series_number REAL,
    status_id TEXT,
    genre_id TEXT,
    format_id TEXT,
    page_count INTEGER,
    publish_year INTEGER,
    rating REAL,
    date_read TEXT,
    date_added TEXT,
    description TEXT,
    cover_url TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE SET NULL,
    FOREIGN KEY (series_id) REFERENCES series(id) ON DELETE SET NULL,
    FOREIGN KEY (status_id) REFERENCES statuses(id) ON DELETE SET NULL,
    FOREIGN KEY (genre_id) REFERENCES genres(id) ON DELETE SET NULL,
    FOREIGN KEY (format_id) REFERENCES formats(id) ON DELETE SET NULL
);

-- Indexes for duplicate lookups and joins
CREATE INDEX IF NOT EXISTS idx_books_author_id ON books(author_id);
CREATE INDEX IF NOT EXISTS idx_books_series_id ON books(series_id);
CREATE INDEX IF NOT EXISTS idx_books_isbn10 ON books(isbn10);
CREATE INDEX IF NOT EXISTS idx_books_isbn13 ON books(isbn13);
CREATE INDEX IF NOT EXISTS idx_books_goodreads_id ON books(goodreads_id);
CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name);
CREATE INDEX IF NOT EXISTS idx_series_title ON series(title);

-- Seed reading statuses
INSERT OR IGNORE INTO statuses (id, key, label) VALUES
    ('status-read', 'read', 'Read'),
    ('status-current', 'current', 'Currently Reading'),
    ('status-next', 'next', 'Up Next');

-- Seed common formats
INSERT OR IGNORE INTO formats (id, name) VALUES
    ('format-hardcover', 'Hardcover'),
    ('format-paperback', 'Paperback'),
    ('format-ebook', 'Ebook'),
    ('format-audiobook', 'Audiobook');
"#;

/// Run all pending database migrations
///
/// Applies schema migrations in order, tracking applied versions in the
/// schema_migrations table. Each migration runs inside its own transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    info!("Running database migrations");

    conn.execute_batch(MIGRATION_TABLE)
        .map_err(BookshelfError::DatabaseError)?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(BookshelfError::DatabaseError)?;

    info!("Current database schema version: {}", current_version);

    if current_version < 1 {
        info!("Applying migration v1: Initial schema");
        apply_migration(conn, 1, MIGRATION_V1)?;
    }

    info!("Database migrations completed successfully");
    Ok(())
}

/// Apply a single migration
fn apply_migration(conn: &mut Connection, version: i64, sql: &str) -> Result<()> {
    let tx = conn
        .transaction()
        .map_err(BookshelfError::DatabaseError)?;

    tx.execute_batch(sql).map_err(|e| {
        warn!("Migration v{} failed: {}", version, e);
        BookshelfError::DatabaseError(e)
    })?;

    tx.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [version],
    )
    .map_err(BookshelfError::DatabaseError)?;

    tx.commit().map_err(BookshelfError::DatabaseError)?;

    info!("Migration v{} applied successfully", version);
    Ok(())
}
