//! Text normalization helpers for matching Polish bank statement content.

use once_cell::sync::Lazy;
use regex::Regex;

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static LONG_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{10,}").expect("static regex"));

/// Normalize counterparty/title text for matching: uppercase, collapse
/// whitespace, strip.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let upper = text.to_uppercase();
    WS_RE.replace_all(upper.trim(), " ").into_owned()
}

/// Normalize a counterparty name for entity resolution: lowercase, collapse
/// whitespace, remove digit runs of 10+ characters (account numbers and
/// transaction references).
pub fn normalize_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let lower = name.to_lowercase();
    let no_refs = LONG_DIGITS_RE.replace_all(&lower, "");
    WS_RE.replace_all(no_refs.trim(), " ").into_owned()
}

/// Fold Polish diacritics to their ASCII base letters.
///
/// Classifier patterns must match both the original and the folded form, so
/// the search text is always tested in both variants. Canonical storage
/// keeps diacritics intact.
pub fn strip_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            'Ą' => 'A',
            'Ć' => 'C',
            'Ę' => 'E',
            'Ł' => 'L',
            'Ń' => 'N',
            'Ó' => 'O',
            'Ś' => 'S',
            'Ź' | 'Ż' => 'Z',
            _ => c,
        })
        .collect()
}

/// Truncate a string to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  biedronka   warszawa "), "BIEDRONKA WARSZAWA");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("a\t\nb"), "A B");
    }

    #[test]
    fn test_normalize_name_strips_account_refs() {
        assert_eq!(
            normalize_name("JAN KOWALSKI 12345678901234567890123456"),
            "jan kowalski"
        );
        assert_eq!(normalize_name("Orlen  S.A."), "orlen s.a.");
    }

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("wypłata gotówki"), "wyplata gotowki");
        assert_eq!(strip_diacritics("OBCIĄŻENIA"), "OBCIAZENIA");
        assert_eq!(strip_diacritics("plain ascii"), "plain ascii");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("żółć", 2), "żó");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
