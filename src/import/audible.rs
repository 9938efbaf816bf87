//! Audible library page import
//!
//! Parses the saved HTML of an Audible "Library > Titles" page. Each row is
//! a `<tr id="adbl-library-content-row-ASIN">` block; rows are sliced out by
//! match position and fields are pulled with ordered fallback patterns, the
//! same technique the Amazon scraper uses for its search results.

use crate::core::error::{BookshelfError, Result};
use crate::core::text::{collapse_whitespace, decode_html_entities};
use crate::import::AudibleBook;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Row anchor. The id suffix carries the ASIN, so one pattern both
    /// delimits rows and identifies them.
    static ref ROW_RE: Regex =
        Regex::new(r#"adbl-library-content-row-([A-Z0-9]{10})"#).unwrap();

    static ref TITLE_HEADLINE_RE: Regex =
        Regex::new(r#"bc-size-headline3[^>]*>\s*([^<]+?)\s*<"#).unwrap();
    static ref TITLE_ARIA_RE: Regex =
        Regex::new(r#"<a[^>]*aria-label="([^"]+)"[^>]*class="bc-link""#).unwrap();

    static ref AUTHOR_RE: Regex =
        Regex::new(r#"(?s)authorLabel.*?<a[^>]*>\s*([^<]+?)\s*</a>"#).unwrap();
    static ref NARRATOR_RE: Regex =
        Regex::new(r#"(?s)narratorLabel.*?<a[^>]*>\s*([^<]+?)\s*</a>"#).unwrap();

    /// Series link plus its optional `, Book N` tail
    static ref SERIES_RE: Regex = Regex::new(
        r#"(?s)seriesLabel.*?<a[^>]*>\s*([^<]+?)\s*</a>\s*(?:,\s*Book\s+(\d+(?:\.\d+)?))?"#
    )
    .unwrap();

    static ref COVER_RE: Regex =
        Regex::new(r#"<img[^>]+src="(https?://[^"]+)""#).unwrap();
}

/// Ordered title extraction; the headline span is the normal case, the
/// aria-label link a fallback for older page captures.
fn extract_title(block: &str) -> Option<String> {
    TITLE_HEADLINE_RE
        .captures(block)
        .or_else(|| TITLE_ARIA_RE.captures(block))
        .map(|caps| collapse_whitespace(&decode_html_entities(&caps[1])))
        .filter(|title| !title.is_empty())
}

fn extract_text(block: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(block)
        .map(|caps| collapse_whitespace(&decode_html_entities(&caps[1])))
        .filter(|text| !text.is_empty())
}

fn parse_row(asin: &str, block: &str) -> Option<AudibleBook> {
    let title = extract_title(block)?;

    let mut book = AudibleBook {
        title,
        asin: Some(asin.to_string()),
        ..AudibleBook::default()
    };

    book.author = extract_text(block, &AUTHOR_RE);
    book.narrator = extract_text(block, &NARRATOR_RE);
    book.cover_url = COVER_RE
        .captures(block)
        .map(|caps| caps[1].to_string());

    if let Some(caps) = SERIES_RE.captures(block) {
        let name = collapse_whitespace(&decode_html_entities(&caps[1]));
        if !name.is_empty() {
            book.series_name = Some(name);
            book.series_number = caps.get(2).and_then(|m| m.as_str().parse().ok());
        }
    }

    Some(book)
}

/// Parse an uploaded Audible library page into import rows.
///
/// Rows without a recognizable title are dropped; a page that yields no rows
/// at all is a user-input error.
pub fn parse_audible_html(content: &str) -> Result<Vec<AudibleBook>> {
    if content.trim().is_empty() {
        return Err(BookshelfError::ValidationError(
            "Uploaded file is empty".to_string(),
        ));
    }

    let anchors: Vec<(usize, String)> = ROW_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), caps[1].to_string()))
        })
        .collect();

    let mut books = Vec::new();
    for (index, (start, asin)) in anchors.iter().enumerate() {
        let end = anchors
            .get(index + 1)
            .map(|(next_start, _)| *next_start)
            .unwrap_or(content.len());
        let block = &content[*start..end];

        if let Some(book) = parse_row(asin, block) {
            books.push(book);
        }
    }

    if books.is_empty() {
        return Err(BookshelfError::ValidationError(
            "No importable rows found in file".to_string(),
        ));
    }

    Ok(books)
}
