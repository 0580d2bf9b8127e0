//! Parses Argentine-format numeric literals lifted from OCR text.
//!
//! Argentine receipts mix `.` as a thousands separator with OCR-corrupted
//! zero sequences (a `0` misread as `o`/`O`, or a stray space splitting a
//! group). The rules below are conservative: unambiguous cases resolve
//! directly, and the one genuinely ambiguous case (a lone `.` with a
//! trailing 3-digit group) escalates to a documented heuristic rather than
//! guessing silently.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OCR_ZERO: Regex = Regex::new(r"(?i)(?P<lead>\d)[oO](?P<trail>\d)").unwrap();
    static ref NOT_DIGIT_SEP: Regex = Regex::new(r"[^0-9.,]").unwrap();
    static ref COMMA_THOUSANDS: Regex = Regex::new(r"^\d{1,3}(,\d{3})+(,\d{1,2})?$").unwrap();
    static ref DOT_THOUSANDS: Regex = Regex::new(r"^\d{1,3}(\.\d{3})+(\.\d{1,2})?$").unwrap();
    static ref TRIPLE_ZERO_LIKE: Regex =
        Regex::new(r"(?i)\.(000|00o|0o0|oo0)(?:\D|$)").unwrap();
    static ref TRAILING_ZEROS: Regex = Regex::new(r"\.0{3,}$").unwrap();
}

/// Repair OCR `o`/`O` misreads that sit between two digits, replacing them
/// with `0`. Runs before separator stripping so `1o0.000` becomes `100.000`.
fn repair_ocr_zeros(input: &str) -> String {
    let mut s = input.to_string();
    loop {
        let replaced = OCR_ZERO
            .replace(&s, |caps: &regex::Captures| {
                format!("{}0{}", &caps["lead"], &caps["trail"])
            })
            .into_owned();
        if replaced == s {
            break;
        }
        s = replaced;
    }
    s
}

/// Strip everything that isn't a digit or a `.`/`,` separator, after
/// replacing exotic whitespace with an ordinary space.
fn strip_to_digits_and_separators(input: &str) -> String {
    let collapsed = crate::utils::text::collapse_exotic_spaces(input);
    let no_ws: String = collapsed.chars().filter(|c| !c.is_whitespace()).collect();
    NOT_DIGIT_SEP.replace_all(&no_ws, "").into_owned()
}

fn strip_leading_trailing_separators(input: &str) -> &str {
    input.trim_matches(|c| c == '.' || c == ',')
}

/// Parse a raw numeric token lifted from OCR text into a real number,
/// applying Argentine thousands/decimal separator conventions plus OCR
/// zero-repair.
///
/// # Examples
/// ```
/// use receipt_ingest::numeric::normalize;
///
/// assert_eq!(normalize("15.000,00"), Some(15000.0));
/// assert_eq!(normalize("$ 2.345.678,90"), Some(2345678.9));
/// assert_eq!(normalize("150 .000"), Some(150000.0));
/// assert_eq!(normalize("1o0.000"), Some(100000.0));
/// assert_eq!(normalize("not a number"), None);
/// ```
pub fn normalize(raw: &str) -> Option<f64> {
    let repaired = repair_ocr_zeros(raw);
    let triple_zero_like = TRIPLE_ZERO_LIKE.is_match(&repaired);
    let stripped = strip_to_digits_and_separators(&repaired);
    let token = strip_leading_trailing_separators(&stripped);
    if token.is_empty() {
        return None;
    }

    let has_dot = token.contains('.');
    let has_comma = token.contains(',');

    if has_dot && has_comma {
        let no_thousands = token.replace('.', "");
        let canonical = no_thousands.replace(',', ".");
        return canonical.parse::<f64>().ok();
    }

    if has_comma {
        if COMMA_THOUSANDS.is_match(token) {
            if let Some(last_comma) = token.rfind(',') {
                let trailing_len = token.len() - last_comma - 1;
                if trailing_len <= 2 && trailing_len > 0 {
                    let (int_part, dec_part) = token.split_at(last_comma);
                    let int_clean = int_part.replace(',', "");
                    let canonical = format!("{}.{}", int_clean, &dec_part[1..]);
                    return canonical.parse::<f64>().ok();
                }
            }
            return token.replace(',', "").parse::<f64>().ok();
        }
        let canonical = token.replace(',', ".");
        return canonical.parse::<f64>().ok();
    }

    if has_dot {
        if triple_zero_like {
            return token.replace('.', "").parse::<f64>().ok();
        }
        if DOT_THOUSANDS.is_match(token) {
            if let Some(last_dot) = token.rfind('.') {
                let trailing_len = token.len() - last_dot - 1;
                if trailing_len <= 2 {
                    let (int_part, dec_part) = token.split_at(last_dot);
                    let int_clean = int_part.replace('.', "");
                    let canonical = format!("{}.{}", int_clean, &dec_part[1..]);
                    return canonical.parse::<f64>().ok();
                }
            }
        }
        let last_group_len = token.rsplit('.').next().map(str::len).unwrap_or(0);
        if last_group_len == 3 {
            return token.replace('.', "").parse::<f64>().ok();
        }
        let value: f64 = token.replace('.', "").parse().ok()?;
        if value < 1000.0 && TRAILING_ZEROS.is_match(token) {
            return Some(value * 1000.0);
        }
        let literal: f64 = token.parse().ok()?;
        return Some(literal);
    }

    token.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_thousands_comma_decimal() {
        assert_eq!(normalize("15.000,00"), Some(15000.0));
        assert_eq!(normalize("2.345.678,90"), Some(2345678.9));
    }

    #[test]
    fn comma_thousands_only() {
        assert_eq!(normalize("15,000"), Some(15000.0));
        assert_eq!(
            normalize("15,000.00".replace('.', ",").as_str()),
            Some(15000.0)
        );
    }

    #[test]
    fn comma_decimal_only() {
        assert_eq!(normalize("150,50"), Some(150.50));
    }

    #[test]
    fn dot_thousands_only_three_digit_groups() {
        assert_eq!(normalize("15.000"), Some(15000.0));
        assert_eq!(normalize("1.500.000"), Some(1500000.0));
    }

    #[test]
    fn dot_decimal_two_digit_tail() {
        assert_eq!(normalize("7.50"), Some(7.50));
    }

    #[test]
    fn triple_zero_like_ocr_corruption() {
        assert_eq!(normalize("150.00o"), Some(15000.0));
        assert_eq!(normalize("150.0o0"), Some(150000.0));
    }

    #[test]
    fn stray_space_before_group() {
        assert_eq!(normalize("150 .000"), Some(150000.0));
    }

    #[test]
    fn ocr_zero_repair_between_digits() {
        assert_eq!(normalize("1o0.000"), Some(100000.0));
    }

    #[test]
    fn currency_symbols_and_noise_stripped() {
        assert_eq!(normalize("$ 2.345.678,90"), Some(2345678.9));
    }

    #[test]
    fn empty_or_garbage_is_none() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("---"), None);
        assert_eq!(normalize("abc"), None);
    }

    #[test]
    fn idempotent_on_its_own_canonical_form() {
        // norm(format(norm(x))) = norm(x): round-tripping a plain integer
        // string through normalize twice yields the same value.
        let once = normalize("15.000,00").unwrap();
        let canonical = format!("{}", once);
        let twice = normalize(&canonical).unwrap();
        assert_eq!(once, twice);
    }
}
