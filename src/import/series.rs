//! Series extraction from combined titles
//!
//! Goodreads and retail sites pack series membership into the title, e.g.
//! `The Way of Kings (The Stormlight Archive, #1)`. Four patterns are tried
//! in priority order; the first that yields both a name and a resolvable
//! position wins and the parenthetical is removed from the title.

use crate::core::text::collapse_whitespace;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `(Series, #1)` or `(Series, #1.5)`
    static ref HASH_COMMA_RE: Regex =
        Regex::new(r"\(([^,()]+),\s*#(\d+(?:\.\d+)?)\)").unwrap();
    /// `(Series, Book One)` or `(Series, Book 3)`
    static ref BOOK_WORD_RE: Regex =
        Regex::new(r"(?i)\(([^,()]+),\s*Book\s+([A-Za-z]+|\d+(?:\.\d+)?)\)").unwrap();
    /// `(Series, Vol. 2)`, `(Series, Volume 2)`, `(Series, Part 2)`
    static ref VOLUME_RE: Regex =
        Regex::new(r"(?i)\(([^,()]+),\s*(?:Vol\.?|Volume|Part)\s*(\d+(?:\.\d+)?)\)").unwrap();
    /// `(Series #4)` without a comma
    static ref HASH_BARE_RE: Regex =
        Regex::new(r"\(([^,()]+?)\s+#(\d+(?:\.\d+)?)\)").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesInfo {
    pub name: String,
    pub number: f64,
}

/// Splits a combined title into a clean title and the series reference, when
/// one of the known parenthetical shapes is present.
pub fn split_series(title: &str) -> (String, Option<SeriesInfo>) {
    let patterns: [&Regex; 4] = [&HASH_COMMA_RE, &BOOK_WORD_RE, &VOLUME_RE, &HASH_BARE_RE];

    for pattern in patterns {
        let Some(caps) = pattern.captures(title) else {
            continue;
        };
        let Some(number) = parse_position(&caps[2]) else {
            // e.g. "(Reader's Digest, Book Club)" has no series position
            continue;
        };

        let name = caps[1].trim().to_string();
        if name.is_empty() {
            continue;
        }

        let matched = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let mut cleaned = String::with_capacity(title.len());
        cleaned.push_str(&title[..matched.start]);
        cleaned.push_str(&title[matched.end..]);

        return (collapse_whitespace(&cleaned), Some(SeriesInfo { name, number }));
    }

    (title.trim().to_string(), None)
}

/// Resolves a captured position: digits parse directly, English number words
/// are looked up in a fixed table.
fn parse_position(raw: &str) -> Option<f64> {
    if raw.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        return raw.parse().ok();
    }
    number_word(raw)
}

fn number_word(word: &str) -> Option<f64> {
    let value = match word.to_lowercase().as_str() {
        "one" => 1.0,
        "two" => 2.0,
        "three" => 3.0,
        "four" => 4.0,
        "five" => 5.0,
        "six" => 6.0,
        "seven" => 7.0,
        "eight" => 8.0,
        "nine" => 9.0,
        "ten" => 10.0,
        "eleven" => 11.0,
        "twelve" => 12.0,
        "thirteen" => 13.0,
        "fourteen" => 14.0,
        "fifteen" => 15.0,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_of(title: &str) -> Option<SeriesInfo> {
        split_series(title).1
    }

    #[test]
    fn test_hash_comma_form() {
        let (title, series) = split_series("The Way of Kings (The Stormlight Archive, #1)");
        assert_eq!(title, "The Way of Kings");
        let series = series.unwrap();
        assert_eq!(series.name, "The Stormlight Archive");
        assert_eq!(series.number, 1.0);
    }

    #[test]
    fn test_book_word_form() {
        let (title, series) = split_series("Gardens of the Moon (Malazan, Book One)");
        assert_eq!(title, "Gardens of the Moon");
        let series = series.unwrap();
        assert_eq!(series.name, "Malazan");
        assert_eq!(series.number, 1.0);
    }

    #[test]
    fn test_book_numeric_form() {
        let series = series_of("Dune (Dune Chronicles, Book 3)").unwrap();
        assert_eq!(series.name, "Dune Chronicles");
        assert_eq!(series.number, 3.0);
    }

    #[test]
    fn test_volume_forms() {
        assert_eq!(
            series_of("Berserk (Berserk, Vol. 12)").unwrap().number,
            12.0
        );
        assert_eq!(
            series_of("Berserk (Berserk, Volume 12)").unwrap().number,
            12.0
        );
        assert_eq!(
            series_of("The Dark Tower (The Dark Tower, Part 2)")
                .unwrap()
                .number,
            2.0
        );
    }

    #[test]
    fn test_bare_hash_form() {
        let series = series_of("Words of Radiance (The Stormlight Archive #2)").unwrap();
        assert_eq!(series.name, "The Stormlight Archive");
        assert_eq!(series.number, 2.0);
    }

    #[test]
    fn test_fractional_position() {
        assert_eq!(
            series_of("Edgedancer (The Stormlight Archive, #2.5)")
                .unwrap()
                .number,
            2.5
        );
    }

    #[test]
    fn test_priority_prefers_hash_comma() {
        // Both the hash-comma and bare-hash patterns could apply; the
        // hash-comma pattern is tried first
        let series = series_of("X (Alpha, #3) (Beta #9)").unwrap();
        assert_eq!(series.name, "Alpha");
        assert_eq!(series.number, 3.0);
    }

    #[test]
    fn test_unknown_number_word_is_not_a_series() {
        // Matches the Book-word pattern shape, but "Club" is not a position
        let (title, series) = split_series("Selected Stories (Reader's Digest, Book Club)");
        assert_eq!(title, "Selected Stories (Reader's Digest, Book Club)");
        assert!(series.is_none());
    }

    #[test]
    fn test_plain_title_passes_through() {
        let (title, series) = split_series("  The Hobbit  ");
        assert_eq!(title, "The Hobbit");
        assert!(series.is_none());
    }
}
