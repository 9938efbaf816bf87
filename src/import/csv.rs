//! CSV parsing for library imports
//!
//! Two dialects are recognized: Goodreads library exports (detected from
//! their characteristic header) and a generic column layout with
//! synonym-tolerant header lookup.
//!
//! The tokenizer is a hand-rolled quote-aware splitter: it handles quoted
//! fields containing commas and doubled-quote escapes, but each physical
//! line is one record — embedded newlines inside quoted fields are not
//! supported.

use crate::core::error::{BookshelfError, Result};
use crate::core::isbn::clean_isbn_cell;
use crate::import::dates::normalize_date;
use crate::import::series::split_series;
use crate::import::ParsedBook;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    Goodreads,
    Generic,
}

/// Splits one physical line into fields, honoring quotes and `""` escapes.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    fields.push(current);
    fields
}

/// Quotes a value when it needs quoting, doubling inner quotes. Clean values
/// pass through unchanged, so escaping them again is a no-op.
pub fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Maps Goodreads shelf names onto internal status keys. Custom shelves do
/// not carry status information.
pub fn shelf_to_status(shelf: &str) -> Option<&'static str> {
    match shelf.trim().to_lowercase().as_str() {
        "read" => Some("read"),
        "currently-reading" => Some("current"),
        "to-read" => Some("next"),
        _ => None,
    }
}

/// Status values accepted in generic CSVs, on top of the Goodreads shelves.
fn status_key(value: &str) -> Option<&'static str> {
    shelf_to_status(value).or_else(|| match value.trim().to_lowercase().as_str() {
        "current" | "currently reading" | "reading" => Some("current"),
        "next" | "to read" | "want to read" => Some("next"),
        _ => None,
    })
}

/// Case-insensitive header index with synonym lookup.
struct HeaderMap {
    index: HashMap<String, usize>,
}

impl HeaderMap {
    fn new(headers: &[String]) -> Self {
        let mut index = HashMap::new();
        for (position, header) in headers.iter().enumerate() {
            let key = header.trim().to_lowercase();
            // First occurrence wins on duplicate headers
            index.entry(key).or_insert(position);
        }
        Self { index }
    }

    fn find(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.index.get(*name).copied())
    }
}

fn field<'a>(fields: &'a [String], index: Option<usize>) -> &'a str {
    index
        .and_then(|i| fields.get(i))
        .map(|value| value.trim())
        .unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parsed_date(value: &str) -> Option<String> {
    non_empty(&normalize_date(value))
}

/// Parses an uploaded CSV into normalized rows.
///
/// Fails only on structural problems (empty file, missing title column, no
/// usable rows); individual bad cells degrade to unset fields.
pub fn parse_csv(content: &str) -> Result<(CsvFormat, Vec<ParsedBook>)> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Err(BookshelfError::ValidationError(
            "Uploaded file is empty".to_string(),
        ));
    };

    let headers = split_csv_line(header_line);
    let header_map = HeaderMap::new(&headers);

    let title_column = header_map.find(&["title", "book title", "name"]);
    if title_column.is_none() {
        return Err(BookshelfError::ValidationError(
            "Malformed CSV: header row is missing a title column".to_string(),
        ));
    }

    let format = detect_format(&header_map);
    let mut books = Vec::new();

    for line in lines {
        let fields = split_csv_line(line);
        let book = match format {
            CsvFormat::Goodreads => parse_goodreads_row(&fields, &header_map),
            CsvFormat::Generic => parse_generic_row(&fields, &header_map),
        };
        if let Some(book) = book {
            books.push(book);
        }
    }

    if books.is_empty() {
        return Err(BookshelfError::ValidationError(
            "No importable rows found in file".to_string(),
        ));
    }

    Ok((format, books))
}

/// A CSV is a Goodreads export iff the header carries Title, Author, and one
/// of the shelf columns.
fn detect_format(headers: &HeaderMap) -> CsvFormat {
    let has_shelves = headers.find(&["bookshelves"]).is_some()
        || headers.find(&["exclusive shelf"]).is_some();
    if headers.find(&["title"]).is_some() && headers.find(&["author"]).is_some() && has_shelves {
        CsvFormat::Goodreads
    } else {
        CsvFormat::Generic
    }
}

fn parse_goodreads_row(fields: &[String], headers: &HeaderMap) -> Option<ParsedBook> {
    let raw_title = field(fields, headers.find(&["title"]));
    if raw_title.is_empty() {
        return None;
    }
    let (title, series) = split_series(raw_title);

    let mut book = ParsedBook {
        title,
        author: non_empty(field(fields, headers.find(&["author"]))),
        goodreads_id: non_empty(field(fields, headers.find(&["book id"]))),
        ..Default::default()
    };

    if let Some(series) = series {
        book.series_name = Some(series.name);
        book.series_number = Some(series.number);
    }

    // Goodreads wraps ISBNs in an ="..." formula to stop spreadsheets from
    // eating leading zeros
    let isbn10 = clean_isbn_cell(field(fields, headers.find(&["isbn"])));
    if isbn10.len() == 10 {
        book.isbn10 = Some(isbn10);
    }
    let isbn13 = clean_isbn_cell(field(fields, headers.find(&["isbn13"])));
    if isbn13.len() == 13 {
        book.isbn13 = Some(isbn13);
    }

    book.rating = field(fields, headers.find(&["my rating"]))
        .parse::<f64>()
        .ok()
        .filter(|rating| *rating > 0.0);
    book.page_count = field(fields, headers.find(&["number of pages"])).parse().ok();
    book.publish_year = field(fields, headers.find(&["year published"]))
        .parse()
        .ok()
        .or_else(|| {
            field(fields, headers.find(&["original publication year"]))
                .parse()
                .ok()
        });

    book.date_read = parsed_date(field(fields, headers.find(&["date read"])));
    book.date_added = parsed_date(field(fields, headers.find(&["date added"])));
    book.format = non_empty(field(fields, headers.find(&["binding"])));

    // Exclusive Shelf is authoritative; fall back to the first listed shelf
    let exclusive = field(fields, headers.find(&["exclusive shelf"]));
    let shelf = if exclusive.is_empty() {
        field(fields, headers.find(&["bookshelves"]))
            .split(',')
            .next()
            .unwrap_or("")
    } else {
        exclusive
    };
    book.status = shelf_to_status(shelf).map(str::to_string);

    Some(book)
}

fn parse_generic_row(fields: &[String], headers: &HeaderMap) -> Option<ParsedBook> {
    let raw_title = field(fields, headers.find(&["title", "book title", "name"]));
    if raw_title.is_empty() {
        return None;
    }
    let (title, title_series) = split_series(raw_title);

    let mut book = ParsedBook {
        title,
        author: non_empty(field(fields, headers.find(&["author", "authors", "author name"]))),
        goodreads_id: non_empty(field(
            fields,
            headers.find(&["goodreads id", "goodreads book id", "book id"]),
        )),
        genre: non_empty(field(fields, headers.find(&["genre", "genres", "category"]))),
        format: non_empty(field(fields, headers.find(&["format", "binding", "medium"]))),
        ..Default::default()
    };

    // A lone ISBN column is routed by length after cleaning
    let isbn = clean_isbn_cell(field(fields, headers.find(&["isbn", "isbn10", "isbn-10"])));
    match isbn.len() {
        10 => book.isbn10 = Some(isbn),
        13 => book.isbn13 = Some(isbn),
        _ => {}
    }
    let isbn13 = clean_isbn_cell(field(fields, headers.find(&["isbn13", "isbn-13"])));
    if isbn13.len() == 13 {
        book.isbn13 = Some(isbn13);
    }

    book.series_name = non_empty(field(fields, headers.find(&["series", "series name"])));
    book.series_number = field(
        fields,
        headers.find(&["series number", "seriesnumber", "series position", "book number"]),
    )
    .parse()
    .ok();
    if book.series_name.is_none() {
        if let Some(series) = title_series {
            book.series_name = Some(series.name);
            book.series_number = Some(series.number);
        }
    }

    book.status = status_key(field(
        fields,
        headers.find(&["status", "shelf", "reading status"]),
    ))
    .map(str::to_string);

    book.page_count = field(
        fields,
        headers.find(&["page count", "pagecount", "pages", "number of pages"]),
    )
    .parse()
    .ok();
    book.publish_year = field(
        fields,
        headers.find(&["publish year", "publication year", "year published", "year"]),
    )
    .parse()
    .ok();
    book.rating = field(fields, headers.find(&["rating", "my rating"]))
        .parse()
        .ok();

    book.date_read = parsed_date(field(fields, headers.find(&["date read", "read date"])));
    book.date_added = parsed_date(field(fields, headers.find(&["date added", "added"])));

    Some(book)
}

/// The downloadable template for the generic format.
pub fn csv_template() -> String {
    let headers = [
        "Title",
        "Author",
        "ISBN",
        "Series",
        "Series Number",
        "Status",
        "Genre",
        "Format",
        "Page Count",
        "Publish Year",
        "Rating",
        "Date Read",
        "Date Added",
    ];
    let examples = [
        [
            "The Hobbit",
            "J.R.R. Tolkien",
            "9780547928227",
            "Middle-earth",
            "1",
            "read",
            "Fantasy",
            "Paperback",
            "300",
            "1937",
            "5",
            "2023-06-01",
            "2023-01-15",
        ],
        [
            "The Lion, the Witch and the Wardrobe",
            "C.S. Lewis",
            "9780064404990",
            "The Chronicles of Narnia",
            "2",
            "next",
            "Fantasy",
            "Hardcover",
            "208",
            "1950",
            "",
            "",
            "",
        ],
    ];

    let mut template = headers.join(",");
    template.push('\n');
    for example in examples {
        let row: Vec<String> = example.iter().map(|value| escape_csv_value(value)).collect();
        template.push_str(&row.join(","));
        template.push('\n');
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOODREADS_HEADER: &str = "Book Id,Title,Author,Author l-f,Additional Authors,ISBN,ISBN13,My Rating,Average Rating,Publisher,Binding,Number of Pages,Year Published,Original Publication Year,Date Read,Date Added,Bookshelves,Exclusive Shelf";

    #[test]
    fn test_split_csv_line_plain() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_csv_line("a,,c"), vec!["a", "", "c"]);
        assert_eq!(split_csv_line("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_split_csv_line_quoted_commas() {
        assert_eq!(
            split_csv_line(r#""The Lion, the Witch and the Wardrobe",C.S. Lewis"#),
            vec!["The Lion, the Witch and the Wardrobe", "C.S. Lewis"]
        );
    }

    #[test]
    fn test_split_csv_line_escaped_quotes() {
        assert_eq!(
            split_csv_line(r#""He said ""hi""",b"#),
            vec![r#"He said "hi""#, "b"]
        );
    }

    #[test]
    fn test_escape_round_trips_through_split() {
        let nasty = r#"A "quoted", value"#;
        let line = format!("{},plain", escape_csv_value(nasty));
        assert_eq!(split_csv_line(&line), vec![nasty, "plain"]);
    }

    #[test]
    fn test_escape_is_idempotent_on_clean_values() {
        assert_eq!(escape_csv_value("The Hobbit"), "The Hobbit");
        assert_eq!(
            escape_csv_value(&escape_csv_value("The Hobbit")),
            "The Hobbit"
        );
    }

    #[test]
    fn test_shelf_mapping() {
        assert_eq!(shelf_to_status("read"), Some("read"));
        assert_eq!(shelf_to_status("currently-reading"), Some("current"));
        assert_eq!(shelf_to_status("to-read"), Some("next"));
        assert_eq!(shelf_to_status("favorites"), None);
        assert_eq!(shelf_to_status("Currently-Reading"), Some("current"));
    }

    #[test]
    fn test_parse_goodreads_export() {
        let csv = format!(
            "{GOODREADS_HEADER}\n\
             7235533,\"The Way of Kings (The Stormlight Archive, #1)\",Brandon Sanderson,\"Sanderson, Brandon\",,\"=\"\"0765326353\"\"\",\"=\"\"9780765326355\"\"\",5,4.65,Tor Books,Hardcover,1007,2010,2010,2023/01/15,2022/12/01,fantasy,currently-reading\n"
        );

        let (format, books) = parse_csv(&csv).unwrap();
        assert_eq!(format, CsvFormat::Goodreads);
        assert_eq!(books.len(), 1);

        let book = &books[0];
        assert_eq!(book.title, "The Way of Kings");
        assert_eq!(book.author.as_deref(), Some("Brandon Sanderson"));
        assert_eq!(book.series_name.as_deref(), Some("The Stormlight Archive"));
        assert_eq!(book.series_number, Some(1.0));
        assert_eq!(book.isbn10.as_deref(), Some("0765326353"));
        assert_eq!(book.isbn13.as_deref(), Some("9780765326355"));
        assert_eq!(book.goodreads_id.as_deref(), Some("7235533"));
        assert_eq!(book.rating, Some(5.0));
        assert_eq!(book.page_count, Some(1007));
        assert_eq!(book.publish_year, Some(2010));
        assert_eq!(book.date_read.as_deref(), Some("2023-01-15"));
        assert_eq!(book.date_added.as_deref(), Some("2022-12-01"));
        assert_eq!(book.format.as_deref(), Some("Hardcover"));
        assert_eq!(book.status.as_deref(), Some("current"));
    }

    #[test]
    fn test_goodreads_unrated_row_has_no_rating() {
        let csv = format!(
            "{GOODREADS_HEADER}\n\
             1,The Hobbit,J.R.R. Tolkien,,,,,0,4.28,,,300,1937,1937,,,fantasy,to-read\n"
        );
        let (_, books) = parse_csv(&csv).unwrap();
        assert_eq!(books[0].rating, None);
        assert_eq!(books[0].status.as_deref(), Some("next"));
    }

    #[test]
    fn test_goodreads_falls_back_to_first_bookshelf() {
        let csv = format!(
            "{GOODREADS_HEADER}\n\
             1,The Hobbit,J.R.R. Tolkien,,,,,0,4.28,,,300,1937,1937,,,\"read, favorites\",\n"
        );
        let (_, books) = parse_csv(&csv).unwrap();
        assert_eq!(books[0].status.as_deref(), Some("read"));
    }

    #[test]
    fn test_parse_generic_with_synonyms() {
        let csv = "Book Title,Authors,ISBN,Series Name,Book Number,Reading Status,Pages,Year\n\
                   Dune,Frank Herbert,9780441172719,Dune Chronicles,1,want to read,412,1965\n";

        let (format, books) = parse_csv(csv).unwrap();
        assert_eq!(format, CsvFormat::Generic);

        let book = &books[0];
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(book.isbn13.as_deref(), Some("9780441172719"));
        assert_eq!(book.series_name.as_deref(), Some("Dune Chronicles"));
        assert_eq!(book.series_number, Some(1.0));
        assert_eq!(book.status.as_deref(), Some("next"));
        assert_eq!(book.page_count, Some(412));
        assert_eq!(book.publish_year, Some(1965));
    }

    #[test]
    fn test_generic_routes_isbn_by_length() {
        let csv = "Title,ISBN\nA,0441172717\nB,9780441172719\n";
        let (_, books) = parse_csv(csv).unwrap();
        assert_eq!(books[0].isbn10.as_deref(), Some("0441172717"));
        assert_eq!(books[0].isbn13, None);
        assert_eq!(books[1].isbn13.as_deref(), Some("9780441172719"));
        assert_eq!(books[1].isbn10, None);
    }

    #[test]
    fn test_generic_extracts_series_from_title_when_no_column() {
        let csv = "Title,Author\n\"Gardens of the Moon (Malazan, Book One)\",Steven Erikson\n";
        let (_, books) = parse_csv(csv).unwrap();
        assert_eq!(books[0].title, "Gardens of the Moon");
        assert_eq!(books[0].series_name.as_deref(), Some("Malazan"));
        assert_eq!(books[0].series_number, Some(1.0));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let err = parse_csv("").unwrap_err();
        assert_eq!(err.to_string(), "Uploaded file is empty");
        let err = parse_csv("\n  \n").unwrap_err();
        assert_eq!(err.to_string(), "Uploaded file is empty");
    }

    #[test]
    fn test_missing_title_column_is_rejected() {
        let err = parse_csv("Author,ISBN\nTolkien,123\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed CSV: header row is missing a title column"
        );
    }

    #[test]
    fn test_header_only_file_has_no_importable_rows() {
        let err = parse_csv("Title,Author\n").unwrap_err();
        assert_eq!(err.to_string(), "No importable rows found in file");
    }

    #[test]
    fn test_rows_without_title_are_skipped() {
        let csv = "Title,Author\n,No Title\nDune,Frank Herbert\n";
        let (_, books) = parse_csv(csv).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
    }

    #[test]
    fn test_template_parses_as_generic() {
        let (format, books) = parse_csv(&csv_template()).unwrap();
        assert_eq!(format, CsvFormat::Generic);
        assert_eq!(books.len(), 2);
        assert_eq!(books[1].title, "The Lion, the Witch and the Wardrobe");
        assert_eq!(books[1].status.as_deref(), Some("next"));
    }
}
