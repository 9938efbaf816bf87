//! Date normalization for import rows
//!
//! Uploaded files carry whatever date format their source emits. Everything
//! is normalized to `YYYY-MM-DD`; input that cannot be parsed becomes an
//! empty string rather than an error, because a bad date should never sink a
//! whole row.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ISO_DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref SLASH_DATE_RE: Regex = Regex::new(r"^\d{4}/\d{2}/\d{2}$").unwrap();
}

/// Format list for the fallback parser, most common first. Goodreads exports
/// use `YYYY/MM/DD`; generic spreadsheets tend toward US ordering.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

pub fn normalize_date(raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }

    if ISO_DATE_RE.is_match(value) {
        return value.to_string();
    }
    if SLASH_DATE_RE.is_match(value) {
        return value.replace('/', "-");
    }

    for format in FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    String::new()
}
