//! Given noisy multi-line OCR/chat text, selects the single most plausible
//! monetary amount. Runs as a fallback when no template matched, and feeds
//! the amount-normalization rules in [`crate::receipt::rules`].

use crate::numeric;
use crate::utils::text::{normalize, trimmed_lines};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DOLLAR_LED: Regex =
        Regex::new(r"\$\s*([0-9][0-9.,\s\u{00A0}\u{202F}]*)").unwrap();
    static ref GROUPED_OR_LONG: Regex =
        Regex::new(r"[1-9]\d{0,2}(?:[.,\s\u{00A0}\u{202F}]\d{3})+(?:[.,]\d{1,2})?|[1-9]\d{4,}(?:[.,]\d{1,2})?")
            .unwrap();
    static ref BARE_FOUR_DIGIT: Regex = Regex::new(r"^\d{4}$").unwrap();
}

const BAD_CTX: &[&str] = &[
    "cuit",
    "cuil",
    "cvu",
    "cbu",
    "coelsa",
    "operación",
    "transacción",
    "identificación",
    "código",
    "número",
    "referencia",
];

const KEY_NEAR: &[&str] = &[
    "comprobante",
    "transferencia",
    "motivo",
    "mercado pago",
    "pagaste",
    "enviaste",
    "de",
    "para",
    "monto",
    "importe",
    "total",
];

fn is_bad_ctx(line: &str) -> bool {
    let lower = line.to_lowercase();
    BAD_CTX.iter().any(|kw| lower.contains(kw))
}

fn is_key_near(line: &str) -> bool {
    let lower = line.to_lowercase();
    KEY_NEAR.iter().any(|kw| lower.contains(kw))
}

fn is_year_token(raw: &str) -> bool {
    if !BARE_FOUR_DIGIT.is_match(raw.trim()) {
        return false;
    }
    match raw.trim().parse::<u32>() {
        Ok(y) => (1900..=2099).contains(&y),
        Err(_) => false,
    }
}

struct Candidate {
    value: f64,
    priority: i32,
}

fn min_distance_to_key_near(lines: &[&str], idx: usize) -> Option<usize> {
    (0..lines.len())
        .filter(|&i| is_key_near(lines[i]))
        .map(|i| (i as isize - idx as isize).unsigned_abs())
        .min()
}

/// Find the single best monetary amount in raw, possibly noisy text.
///
/// # Examples
/// ```
/// use receipt_ingest::amount::find;
///
/// assert_eq!(find("Pagaste\n$ 15.000,00\nReferencia: AB-12"), Some(15000.0));
/// assert_eq!(find("año 2024 factura 1999"), None);
/// ```
pub fn find(text: &str) -> Option<f64> {
    let normalized = normalize(text);
    let lines = trimmed_lines(&normalized);

    let mut candidates: Vec<Candidate> = Vec::new();

    // Pass A: every $-led number on a non-BAD_CTX line.
    for line in &lines {
        if is_bad_ctx(line) {
            continue;
        }
        for caps in DOLLAR_LED.captures_iter(line) {
            if let Some(value) = numeric::normalize(&caps[1]) {
                candidates.push(Candidate {
                    value,
                    priority: 6,
                });
            }
        }
    }

    // Pass B only runs if pass A found nothing.
    if candidates.is_empty() {
        for (idx, line) in lines.iter().enumerate() {
            if is_bad_ctx(line) {
                continue;
            }
            for m in GROUPED_OR_LONG.find_iter(line) {
                let raw = m.as_str();
                if is_year_token(raw) {
                    continue;
                }
                if let Some(value) = numeric::normalize(raw) {
                    let distance = min_distance_to_key_near(&lines, idx).unwrap_or(usize::MAX);
                    let boost = if distance == usize::MAX {
                        0
                    } else {
                        3i32.saturating_sub(distance as i32).max(0)
                    };
                    candidates.push(Candidate {
                        value,
                        priority: 2 + boost,
                    });
                }
            }
        }
    }

    let mut candidates: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| (50.0..=10_000_000.0).contains(&c.value))
        .collect();

    if candidates.iter().any(|c| c.value >= 1000.0) {
        candidates.retain(|c| c.value >= 1000.0);
    }

    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.value.partial_cmp(&a.value).unwrap())
    });

    candidates.first().map(|c| c.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_led_amount_wins() {
        assert_eq!(
            find("Mercado Pago\nPagaste\n$ 15.000,00\nReferencia: AB-12"),
            Some(15000.0)
        );
    }

    #[test]
    fn year_rejected_without_dollar_sign() {
        assert_eq!(find("año 2024 factura 1999"), None);
    }

    #[test]
    fn bad_ctx_lines_are_excluded() {
        let text = "CUIT 20-12345678-9\nCVU 0000003100012345678901\n$ 2.345.678,90";
        assert_eq!(find(text), Some(2345678.9));
    }

    #[test]
    fn twenty_two_digit_token_never_chosen() {
        let text = "$ 100\nCVU 0000003100012345678901";
        let result = find(text).unwrap();
        assert!(result < 1_000_000_000_000.0);
    }

    #[test]
    fn below_fifty_is_rejected() {
        assert_eq!(find("$ 10"), None);
    }

    #[test]
    fn above_ten_million_is_rejected() {
        assert_eq!(find("$ 99.000.000"), None);
    }

    #[test]
    fn key_near_boosts_grouped_candidate() {
        let text = "Monto\n15000\notro texto\nmas texto\nmas\n4500";
        let result = find(text);
        assert_eq!(result, Some(15000.0));
    }
}
