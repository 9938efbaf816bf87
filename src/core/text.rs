//! Text cleanup helpers for scraped HTML
//!
//! Every human-readable field extracted from provider markup passes through
//! these before being returned: entity decoding (named, decimal, hex),
//! tag stripping, and whitespace normalization.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;

lazy_static! {
    static ref ENTITY_RE: Regex =
        Regex::new(r"&(?:#[xX]([0-9a-fA-F]{1,6})|#([0-9]{1,7})|([a-zA-Z][a-zA-Z0-9]{1,30}));")
            .unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Decode HTML entities in place: named entities from a fixed table, numeric
/// decimal (`&#233;`) and numeric hex (`&#xE9;`) forms. Unknown names and
/// out-of-range codepoints are left as-is.
pub fn decode_html_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            if let Some(hex) = caps.get(1) {
                return numeric_entity(hex.as_str(), 16)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            if let Some(dec) = caps.get(2) {
                return numeric_entity(dec.as_str(), 10)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            match named_entity(&caps[3]) {
                Some(decoded) => decoded.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn numeric_entity(digits: &str, radix: u32) -> Option<String> {
    let code = u32::from_str_radix(digits, radix).ok()?;
    let ch = char::from_u32(code)?;
    Some(ch.to_string())
}

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "laquo" => "\u{00AB}",
        "raquo" => "\u{00BB}",
        "middot" => "\u{00B7}",
        "bull" => "\u{2022}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "deg" => "\u{00B0}",
        "plusmn" => "\u{00B1}",
        "frac12" => "\u{00BD}",
        "frac14" => "\u{00BC}",
        "times" => "\u{00D7}",
        "divide" => "\u{00F7}",
        "szlig" => "\u{00DF}",
        "agrave" => "\u{00E0}",
        "aacute" => "\u{00E1}",
        "auml" => "\u{00E4}",
        "ccedil" => "\u{00E7}",
        "egrave" => "\u{00E8}",
        "eacute" => "\u{00E9}",
        "iacute" => "\u{00ED}",
        "ntilde" => "\u{00F1}",
        "oacute" => "\u{00F3}",
        "ouml" => "\u{00F6}",
        "uacute" => "\u{00FA}",
        "uuml" => "\u{00FC}",
        _ => return None,
    };
    Some(decoded)
}

/// Remove HTML tags, replacing each with a space so adjacent words stay split.
pub fn strip_html_tags(text: &str) -> String {
    TAG_RE.replace_all(text, " ").into_owned()
}

/// Collapse runs of whitespace (including newlines) to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    match WHITESPACE_RE.replace_all(text.trim(), " ") {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Full cleanup for an HTML fragment such as a scraped description:
/// strip tags first (so decoded `&lt;` cannot create new ones), then decode
/// entities, then normalize whitespace.
pub fn clean_html_fragment(text: &str) -> String {
    collapse_whitespace(&decode_html_entities(&strip_html_tags(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_entities() {
        assert_eq!(
            decode_html_entities("Crime &amp; Punishment"),
            "Crime & Punishment"
        );
        assert_eq!(decode_html_entities("&lt;b&gt;bold&lt;/b&gt;"), "<b>bold</b>");
        assert_eq!(decode_html_entities("it&rsquo;s"), "it\u{2019}s");
        assert_eq!(decode_html_entities("Caf&eacute;"), "Caf\u{00E9}");
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_html_entities("Caf&#233;"), "Caf\u{00E9}");
        assert_eq!(decode_html_entities("Caf&#xE9;"), "Caf\u{00E9}");
        assert_eq!(decode_html_entities("Caf&#xe9;"), "Caf\u{00E9}");
    }

    #[test]
    fn test_unknown_entities_pass_through() {
        assert_eq!(decode_html_entities("&bogus123;"), "&bogus123;");
        // Surrogate range is not a valid char
        assert_eq!(decode_html_entities("&#xD800;"), "&#xD800;");
    }

    #[test]
    fn test_bare_ampersand_untouched() {
        assert_eq!(decode_html_entities("Dungeons & Dragons"), "Dungeons & Dragons");
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(
            collapse_whitespace(&strip_html_tags("<p>First</p><p>Second</p>")),
            "First Second"
        );
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c  "), "a b c");
    }

    #[test]
    fn test_clean_html_fragment() {
        let raw = "<p>A story of  war &amp; peace.</p>\n<p>Second &#8220;chapter&#8221;.</p>";
        assert_eq!(
            clean_html_fragment(raw),
            "A story of war & peace. Second \u{201C}chapter\u{201D}."
        );
    }

    #[test]
    fn test_clean_fragment_does_not_create_tags() {
        // Encoded angle brackets must survive as literal text, not get stripped.
        assert_eq!(clean_html_fragment("3 &lt; 5"), "3 < 5");
    }
}
