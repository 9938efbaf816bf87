//! Fuzzy matching of import rows against the existing catalog
//!
//! Similarity blends two signals: token overlap (a token counts as matched
//! when the other string has it exactly or within edit distance 1) weighted
//! 0.6, and normalized Levenshtein distance weighted 0.4. Author names are
//! normalized first so `"Sanderson, Brandon"` and `"Brandon Sanderson"` are
//! the same person.
//!
//! Everything here is pure over caller-supplied candidate lists; the
//! handlers fetch the catalog snapshot once per upload.

use crate::core::text::collapse_whitespace;
use crate::db::models::{Author, Series};
use crate::import::MatchInfo;
use strsim::levenshtein;

/// Minimum similarity for an author or series candidate to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.80;

/// Canonical form for author-name comparison: lowercase, `"Last, First"`
/// reordered, periods and apostrophes stripped, hyphens spaced, whitespace
/// collapsed.
pub fn normalize_author_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    let reordered = {
        let parts: Vec<&str> = lowered.split(',').collect();
        if parts.len() == 2 {
            format!("{} {}", parts[1].trim(), parts[0].trim())
        } else {
            lowered
        }
    };

    let stripped: String = reordered
        .chars()
        .filter_map(|c| match c {
            '.' | '\'' => None,
            '-' => Some(' '),
            _ => Some(c),
        })
        .collect();

    collapse_whitespace(&stripped)
}

/// Canonical form for title comparison: lowercase, non-alphanumerics removed
/// (whitespace kept), whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    let stripped: String = title
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    collapse_whitespace(&stripped)
}

/// Fraction of the shorter string's tokens that appear in the other string,
/// exactly or within edit distance 1.
fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let (shorter, longer) = if tokens_a.len() <= tokens_b.len() {
        (&tokens_a, &tokens_b)
    } else {
        (&tokens_b, &tokens_a)
    };

    let matched = shorter
        .iter()
        .filter(|token| {
            longer
                .iter()
                .any(|other| token == &other || levenshtein(token, other) <= 1)
        })
        .count();

    matched as f64 / shorter.len() as f64
}

/// Combined similarity over already-normalized strings, in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let overlap = token_overlap(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    let edit = 1.0 - levenshtein(a, b) as f64 / max_len as f64;

    0.6 * overlap + 0.4 * edit
}

pub fn author_similarity(a: &str, b: &str) -> f64 {
    similarity(&normalize_author_name(a), &normalize_author_name(b))
}

pub fn title_similarity(a: &str, b: &str) -> f64 {
    similarity(&normalize_title(a), &normalize_title(b))
}

/// Best author candidate at or above the threshold, or `None`.
pub fn match_author(name: &str, candidates: &[Author]) -> Option<MatchInfo> {
    let mut best: Option<(f64, &Author)> = None;

    for candidate in candidates {
        let sim = author_similarity(name, &candidate.name);
        if sim >= MATCH_THRESHOLD && best.map_or(true, |(current, _)| sim > current) {
            best = Some((sim, candidate));
        }
    }

    best.map(|(sim, author)| MatchInfo {
        id: author.id.clone(),
        name: author.name.clone(),
        confidence: (sim * 100.0).round() as u32,
        exact: sim >= 1.0,
    })
}

/// Best series candidate at or above the threshold, or `None`.
pub fn match_series(title: &str, candidates: &[Series]) -> Option<MatchInfo> {
    let mut best: Option<(f64, &Series)> = None;

    for candidate in candidates {
        let sim = title_similarity(title, &candidate.title);
        if sim >= MATCH_THRESHOLD && best.map_or(true, |(current, _)| sim > current) {
            best = Some((sim, candidate));
        }
    }

    best.map(|(sim, series)| MatchInfo {
        id: series.id.clone(),
        name: series.title.clone(),
        confidence: (sim * 100.0).round() as u32,
        exact: sim >= 1.0,
    })
}
