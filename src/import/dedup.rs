//! Duplicate detection for import rows
//!
//! Rules fire in a fixed order and the first hit wins: ISBN-13, then ISBN-10
//! (checked against either ISBN field of the existing record, since exports
//! sometimes file a 10-digit code under the wrong column), then Goodreads id,
//! then a fuzzy title + author pair. Identity beats similarity: two books
//! sharing an ISBN are the same book no matter what their titles look like.

use crate::db::models::BookCandidate;
use crate::import::matching::{author_similarity, title_similarity};
use crate::import::{AudibleBook, ParsedBook};

const TITLE_DUPLICATE_THRESHOLD: f64 = 0.85;
const AUTHOR_DUPLICATE_THRESHOLD: f64 = 0.80;

/// The identity fields of an incoming row, in one place so CSV and Audible
/// rows share the same detector.
#[derive(Debug, Default)]
pub struct DuplicateProbe<'a> {
    pub title: &'a str,
    pub author: Option<&'a str>,
    pub isbn10: Option<&'a str>,
    pub isbn13: Option<&'a str>,
    pub goodreads_id: Option<&'a str>,
}

impl ParsedBook {
    pub fn duplicate_probe(&self) -> DuplicateProbe<'_> {
        DuplicateProbe {
            title: &self.title,
            author: self.author.as_deref(),
            isbn10: self.isbn10.as_deref(),
            isbn13: self.isbn13.as_deref(),
            goodreads_id: self.goodreads_id.as_deref(),
        }
    }
}

impl AudibleBook {
    pub fn duplicate_probe(&self) -> DuplicateProbe<'_> {
        DuplicateProbe {
            title: &self.title,
            author: self.author.as_deref(),
            ..DuplicateProbe::default()
        }
    }
}

/// First existing book the probe collides with, or `None`.
pub fn find_duplicate<'a>(
    probe: &DuplicateProbe<'_>,
    existing: &'a [BookCandidate],
) -> Option<&'a BookCandidate> {
    if let Some(isbn13) = probe.isbn13 {
        if let Some(hit) = existing
            .iter()
            .find(|book| book.isbn13.as_deref() == Some(isbn13))
        {
            return Some(hit);
        }
    }

    if let Some(isbn10) = probe.isbn10 {
        if let Some(hit) = existing.iter().find(|book| {
            book.isbn10.as_deref() == Some(isbn10) || book.isbn13.as_deref() == Some(isbn10)
        }) {
            return Some(hit);
        }
    }

    if let Some(goodreads_id) = probe.goodreads_id {
        if let Some(hit) = existing
            .iter()
            .find(|book| book.goodreads_id.as_deref() == Some(goodreads_id))
        {
            return Some(hit);
        }
    }

    let author = probe.author?;
    existing.iter().find(|book| {
        let Some(existing_author) = book.author_name.as_deref() else {
            return false;
        };
        title_similarity(probe.title, &book.title) >= TITLE_DUPLICATE_THRESHOLD
            && author_similarity(author, existing_author) >= AUTHOR_DUPLICATE_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        id: &str,
        title: &str,
        author: Option<&str>,
        isbn10: Option<&str>,
        isbn13: Option<&str>,
        goodreads_id: Option<&str>,
    ) -> BookCandidate {
        BookCandidate {
            id: id.to_string(),
            title: title.to_string(),
            author_name: author.map(str::to_string),
            isbn10: isbn10.map(str::to_string),
            isbn13: isbn13.map(str::to_string),
            goodreads_id: goodreads_id.map(str::to_string),
        }
    }

    #[test]
    fn test_isbn13_match_beats_mismatched_titles() {
        // Same ISBN-13 but entirely different title and author: still the
        // same book, because the ISBN rule fires before the fuzzy rule.
        let existing = vec![candidate(
            "b1",
            "Completely Different Title",
            Some("Somebody Else"),
            None,
            Some("9780765326355"),
            None,
        )];

        let probe = DuplicateProbe {
            title: "The Way of Kings",
            author: Some("Brandon Sanderson"),
            isbn13: Some("9780765326355"),
            ..DuplicateProbe::default()
        };

        let hit = find_duplicate(&probe, &existing);
        assert_eq!(hit.map(|b| b.id.as_str()), Some("b1"));
    }

    #[test]
    fn test_isbn10_checked_against_both_fields() {
        let existing = vec![candidate(
            "b1",
            "The Hobbit",
            Some("J.R.R. Tolkien"),
            None,
            // A 10-digit code filed under the 13-digit column
            Some("0547928220"),
            None,
        )];

        let probe = DuplicateProbe {
            title: "Anything",
            isbn10: Some("0547928220"),
            ..DuplicateProbe::default()
        };

        assert!(find_duplicate(&probe, &existing).is_some());
    }

    #[test]
    fn test_goodreads_id_match() {
        let existing = vec![
            candidate("b1", "Dune", Some("Frank Herbert"), None, None, Some("234225")),
            candidate("b2", "Dune Messiah", Some("Frank Herbert"), None, None, Some("44492285")),
        ];

        let probe = DuplicateProbe {
            title: "Dune (unabridged)",
            goodreads_id: Some("44492285"),
            ..DuplicateProbe::default()
        };

        assert_eq!(
            find_duplicate(&probe, &existing).map(|b| b.id.as_str()),
            Some("b2")
        );
    }

    #[test]
    fn test_fuzzy_match_requires_title_and_author() {
        let existing = vec![candidate(
            "b1",
            "The Way of Kings",
            Some("Brandon Sanderson"),
            None,
            None,
            None,
        )];

        // Minor typo in the title, author order flipped
        let probe = DuplicateProbe {
            title: "The Way of King",
            author: Some("Sanderson, Brandon"),
            ..DuplicateProbe::default()
        };
        assert!(find_duplicate(&probe, &existing).is_some());

        // Same title, different author: not a duplicate
        let probe = DuplicateProbe {
            title: "The Way of Kings",
            author: Some("George Martin"),
            ..DuplicateProbe::default()
        };
        assert!(find_duplicate(&probe, &existing).is_none());

        // No author on the probe: fuzzy rule cannot fire at all
        let probe = DuplicateProbe {
            title: "The Way of Kings",
            ..DuplicateProbe::default()
        };
        assert!(find_duplicate(&probe, &existing).is_none());
    }

    #[test]
    fn test_no_duplicate_in_empty_catalog() {
        let probe = DuplicateProbe {
            title: "The Way of Kings",
            author: Some("Brandon Sanderson"),
            isbn13: Some("9780765326355"),
            ..DuplicateProbe::default()
        };
        assert!(find_duplicate(&probe, &[]).is_none());
    }

    #[test]
    fn test_parsed_book_probe_carries_identity_fields() {
        let book = ParsedBook {
            title: "Dune".to_string(),
            author: Some("Frank Herbert".to_string()),
            isbn13: Some("9780441172719".to_string()),
            goodreads_id: Some("234225".to_string()),
            ..ParsedBook::default()
        };

        let probe = book.duplicate_probe();
        assert_eq!(probe.title, "Dune");
        assert_eq!(probe.isbn13, Some("9780441172719"));
        assert_eq!(probe.goodreads_id, Some("234225"));
        assert_eq!(probe.isbn10, None);
    }
}
