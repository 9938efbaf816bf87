//! ISBN normalization and validation
//!
//! Validation is purely structural (no checksum): after normalization an ISBN
//! is 10 digits, 13 digits, or 9 digits followed by `X`.

/// Strip hyphens and spaces and uppercase the remainder.
pub fn normalize_isbn(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect::<String>()
        .to_uppercase()
}

/// Structural ISBN validity on an already-normalized string.
pub fn is_valid_isbn(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    match bytes.len() {
        10 => {
            let (digits, last) = bytes.split_at(9);
            digits.iter().all(u8::is_ascii_digit)
                && (last[0].is_ascii_digit() || last[0] == b'X')
        }
        13 => bytes.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

/// Clean an ISBN cell from a Goodreads CSV export.
///
/// Goodreads wraps ISBNs in a spreadsheet formula (`="9780544003415"`) to stop
/// Excel from mangling them. Strips the leading `=` and any quotes, then
/// normalizes. Returns an empty string when nothing usable remains.
pub fn clean_isbn_cell(cell: &str) -> String {
    let stripped: String = cell
        .trim()
        .trim_start_matches('=')
        .chars()
        .filter(|c| *c != '"')
        .collect();
    let normalized = normalize_isbn(&stripped);
    if is_valid_isbn(&normalized) {
        normalized
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_separators_and_uppercases() {
        assert_eq!(normalize_isbn("978-0-544-00341-5"), "9780544003415");
        assert_eq!(normalize_isbn("0 306 40615 x"), "030640615X");
        assert_eq!(normalize_isbn("  9780544003415  "), "9780544003415");
    }

    #[test]
    fn test_valid_shapes() {
        assert!(is_valid_isbn("9780544003415"));
        assert!(is_valid_isbn("0306406152"));
        assert!(is_valid_isbn("030640615X"));
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(!is_valid_isbn(""));
        assert!(!is_valid_isbn("12345"));
        assert!(!is_valid_isbn("978054400341"));
        assert!(!is_valid_isbn("X306406152"));
        assert!(!is_valid_isbn("03064061 52"));
        assert!(!is_valid_isbn("978054400341X"));
    }

    #[test]
    fn test_clean_goodreads_formula_cell() {
        assert_eq!(clean_isbn_cell("=\"9780544003415\""), "9780544003415");
        assert_eq!(clean_isbn_cell("=\"030640615X\""), "030640615X");
        assert_eq!(clean_isbn_cell("=\"\""), "");
        assert_eq!(clean_isbn_cell("not an isbn"), "");
    }

    /// Reference predicate written independently of `is_valid_isbn`.
    fn oracle(raw: &str) -> bool {
        let cleaned: Vec<char> = raw
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != ' ')
            .collect::<String>()
            .to_uppercase()
            .chars()
            .collect();
        let ten = cleaned.len() == 10
            && cleaned[..9].iter().all(|c| c.is_ascii_digit())
            && (cleaned[9].is_ascii_digit() || cleaned[9] == 'X');
        let thirteen = cleaned.len() == 13 && cleaned.iter().all(|c| c.is_ascii_digit());
        ten || thirteen
    }

    proptest! {
        #[test]
        fn prop_validity_matches_shape(s in "[0-9Xx \\-]{0,16}") {
            prop_assert_eq!(is_valid_isbn(&normalize_isbn(&s)), oracle(&s));
        }

        #[test]
        fn prop_arbitrary_strings_never_panic(s in ".*") {
            prop_assert_eq!(is_valid_isbn(&normalize_isbn(&s)), oracle(&s));
        }

        #[test]
        fn prop_normalize_is_idempotent(s in "[0-9Xx \\-]{0,16}") {
            let once = normalize_isbn(&s);
            prop_assert_eq!(normalize_isbn(&once), once.clone());
        }
    }
}
