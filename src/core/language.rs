//! Language-code mapping
//!
//! Providers disagree on language representation (ISO 639-1 two-letter codes,
//! 639-2 three-letter codes, sometimes full names). A fixed table maps the
//! codes we see in practice to English names; anything unrecognized passes
//! through unchanged so no information is lost.

/// Map a 2- or 3-letter ISO language code to its English name.
/// Unrecognized input is returned as-is.
pub fn language_name(code: &str) -> String {
    let name = match code.trim().to_lowercase().as_str() {
        "en" | "eng" => "English",
        "fr" | "fre" | "fra" => "French",
        "de" | "ger" | "deu" => "German",
        "es" | "spa" => "Spanish",
        "it" | "ita" => "Italian",
        "pt" | "por" => "Portuguese",
        "nl" | "dut" | "nld" => "Dutch",
        "ja" | "jpn" => "Japanese",
        "zh" | "chi" | "zho" => "Chinese",
        "ko" | "kor" => "Korean",
        "ru" | "rus" => "Russian",
        "ar" | "ara" => "Arabic",
        "hi" | "hin" => "Hindi",
        "sv" | "swe" => "Swedish",
        "no" | "nor" => "Norwegian",
        "da" | "dan" => "Danish",
        "fi" | "fin" => "Finnish",
        "pl" | "pol" => "Polish",
        "tr" | "tur" => "Turkish",
        "he" | "heb" => "Hebrew",
        "el" | "gre" | "ell" => "Greek",
        "cs" | "cze" | "ces" => "Czech",
        "hu" | "hun" => "Hungarian",
        "uk" | "ukr" => "Ukrainian",
        "ro" | "ron" | "rum" => "Romanian",
        _ => return code.to_string(),
    };
    name.to_string()
}
