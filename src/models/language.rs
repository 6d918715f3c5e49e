//! Language name handling

use once_cell::sync::Lazy;
use regex::Regex;

static LANGUAGE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid language tag pattern")
});

/// Resolve a requested language to its canonical name.
///
/// An empty request resolves to `default`. Subtags are normalized the way
/// culture names are written: `en-us` becomes `en-US`, `zh-hant-tw` becomes
/// `zh-Hant-TW`. Returns `None` for values that are not language tags.
pub fn canonical_language(requested: &str, default: &str) -> Option<String> {
    let requested = requested.trim();
    if requested.is_empty() {
        return canonical_language(default, "en");
    }
    if !LANGUAGE_TAG.is_match(requested) {
        return None;
    }

    let canonical = requested
        .split('-')
        .enumerate()
        .map(|(position, subtag)| {
            if position == 0 {
                subtag.to_ascii_lowercase()
            } else if subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                subtag.to_ascii_uppercase()
            } else if subtag.len() == 4 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                let mut chars = subtag.chars();
                let first = chars.next().map(|c| c.to_ascii_uppercase());
                first
                    .into_iter()
                    .chain(chars.map(|c| c.to_ascii_lowercase()))
                    .collect()
            } else {
                subtag.to_ascii_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join("-");

    Some(canonical)
}

/// Whether `language` asks for results in every language
pub fn is_all_languages(language: &str) -> bool {
    language.eq_ignore_ascii_case("all")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_forms() {
        assert_eq!(canonical_language("en", "en").as_deref(), Some("en"));
        assert_eq!(canonical_language("EN-us", "en").as_deref(), Some("en-US"));
        assert_eq!(
            canonical_language("zh-hant-tw", "en").as_deref(),
            Some("zh-Hant-TW")
        );
        assert_eq!(canonical_language("da-DK", "en").as_deref(), Some("da-DK"));
    }

    #[test]
    fn test_empty_uses_default() {
        assert_eq!(canonical_language("", "de-de").as_deref(), Some("de-DE"));
        assert_eq!(canonical_language("  ", "").as_deref(), Some("en"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(canonical_language("e", "en"), None);
        assert_eq!(canonical_language("en_US", "en"), None);
        assert_eq!(canonical_language("!!", "en"), None);
    }

    #[test]
    fn test_all_languages() {
        assert!(is_all_languages("all"));
        assert!(is_all_languages("ALL"));
        assert!(is_all_languages("All"));
        assert!(!is_all_languages("en"));
        assert!(!is_all_languages(""));
    }
}
