//! Text normalization shared by the amount finder, template parser and field
//! extractor. Kept as pure functions over `&str` so every consumer normalizes
//! identically regardless of which stage touches the text first.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXOTIC_SPACE: Regex = Regex::new(r"[\u{00A0}\u{202F}]").unwrap();
    static ref CURRENCY_PREFIX: Regex = Regex::new(r"(?i)\bS\$|\bS\s0\b|\bARS\s?").unwrap();
    static ref SMART_QUOTES: Regex = Regex::new(r#"[\u{2018}\u{2019}]"#).unwrap();
    static ref SMART_DOUBLE_QUOTES: Regex = Regex::new(r#"[\u{201C}\u{201D}]"#).unwrap();
}

/// Replace non-breaking and narrow no-break spaces with ordinary ASCII spaces.
///
/// # Examples
/// ```
/// use receipt_ingest::utils::text::collapse_exotic_spaces;
///
/// assert_eq!(collapse_exotic_spaces("1\u{00A0}000"), "1 000");
/// assert_eq!(collapse_exotic_spaces("1\u{202F}000"), "1 000");
/// ```
pub fn collapse_exotic_spaces(input: &str) -> String {
    EXOTIC_SPACE.replace_all(input, " ").into_owned()
}

/// Normalize smart quotes to their ASCII equivalents.
pub fn unify_quotes(input: &str) -> String {
    let s = SMART_QUOTES.replace_all(input, "'");
    SMART_DOUBLE_QUOTES.replace_all(&s, "\"").into_owned()
}

/// Map known currency prefixes (`S$`, `S 0`, `ARS `) to a bare `$`.
///
/// # Examples
/// ```
/// use receipt_ingest::utils::text::unify_currency_prefix;
///
/// assert_eq!(unify_currency_prefix("ARS 1.500"), "$1.500");
/// assert_eq!(unify_currency_prefix("S$ 200"), "$ 200");
/// ```
pub fn unify_currency_prefix(input: &str) -> String {
    CURRENCY_PREFIX.replace_all(input, "$").into_owned()
}

/// Full pre-normalization pass used before any amount/template/field logic:
/// collapse exotic spaces, unify quotes, unify currency prefixes.
///
/// # Examples
/// ```
/// use receipt_ingest::utils::text::normalize;
///
/// assert_eq!(normalize("ARS 1\u{00A0}500"), "$1 500");
/// ```
pub fn normalize(input: &str) -> String {
    let s = collapse_exotic_spaces(input);
    let s = unify_quotes(&s);
    unify_currency_prefix(&s)
}

/// Split text into trimmed, non-empty lines.
///
/// # Examples
/// ```
/// use receipt_ingest::utils::text::trimmed_lines;
///
/// let lines = trimmed_lines(" hola \n\n mundo ");
/// assert_eq!(lines, vec!["hola", "mundo"]);
/// ```
pub fn trimmed_lines(input: &str) -> Vec<&str> {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_unifies() {
        let out = normalize("ARS  1\u{00A0}500\u{202F}00");
        assert!(out.starts_with('$'));
        assert!(!out.contains('\u{00A0}'));
        assert!(!out.contains('\u{202F}'));
    }

    #[test]
    fn trimmed_lines_skips_blank() {
        assert_eq!(trimmed_lines("a\n\n  \nb\n"), vec!["a", "b"]);
    }
}
