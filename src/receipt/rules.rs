//! Amount-normalization rules applied by the Receipt Pipeline, in order
//! (§4.7). Expressed as an ordered pipeline of pure functions per the
//! spec's own design note: easy to re-test and re-order independently of
//! the pipeline that drives them.

use crate::amount::find as find_amount;
use crate::types::ReceiptMimeType;
use lazy_static::lazy_static;
use regex::Regex;

const MAX_REASONABLE_AMOUNT: f64 = 10_000_000.0;
const MIN_REASONABLE_AMOUNT: f64 = 1_000.0;

lazy_static! {
    static ref GROUPED: Regex = Regex::new(
        r"[1-9]\d{0,2}(?:[.,\s\u{00A0}\u{202F}]\d{3})+(?:[.,]\d{1,2})?|[1-9]\d{4,}(?:[.,]\d{1,2})?"
    )
    .unwrap();
    static ref TRIPLE_ZERO_LIKE: Regex = Regex::new(r"(?i)\.(000|00o|0o0|oo0)(?:\D|$)").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();
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

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Safety "largest grouped amount" rule: when no usable amount has
/// survived, scan non-BAD_CTX lines that carry `$` or a KEY_NEAR keyword
/// for grouped numerics, rejecting CVU/CBU/ID-shaped tokens.
pub fn largest_grouped_amount(text: &str) -> Option<f64> {
    let mut best: Option<f64> = None;
    for line in text.lines() {
        let lower = line.to_lowercase();
        if BAD_CTX.iter().any(|kw| lower.contains(kw)) {
            continue;
        }
        let relevant = line.contains('$') || KEY_NEAR.iter().any(|kw| lower.contains(kw));
        if !relevant {
            continue;
        }
        for m in GROUPED.find_iter(line) {
            let raw = m.as_str();
            if digit_count(raw) >= 15 || digit_count(raw) == 22 {
                continue;
            }
            if let Some(value) = crate::numeric::normalize(raw) {
                if (MIN_REASONABLE_AMOUNT..=MAX_REASONABLE_AMOUNT).contains(&value) {
                    best = Some(best.map_or(value, |b: f64| b.max(value)));
                }
            }
        }
    }
    best
}

/// Triple-zero hint: if `amount < 1000` and the text shows an OCR-corrupted
/// triple-zero marker, multiply by 1000.
pub fn triple_zero_hint(amount: Option<f64>, text: &str) -> Option<f64> {
    match amount {
        Some(a) if a < MIN_REASONABLE_AMOUNT && TRIPLE_ZERO_LIKE.is_match(text) => {
            Some(a * 1000.0)
        }
        other => other,
    }
}

/// Mercado-Pago ×1000 rule (feature flag, default on): if the provider is
/// MP and `0 < amount < 1000`, multiply by 1000, reverting to the
/// pre-multiply value if the product would cross 10,000,000 (Open Question
/// (a), resolved conservatively).
pub fn mp_force_x1000(amount: Option<f64>, provider: Option<&str>, enabled: bool) -> Option<f64> {
    if !enabled {
        return amount;
    }
    match (amount, provider) {
        (Some(a), Some(p)) if p == "Mercado Pago" && a > 0.0 && a < MIN_REASONABLE_AMOUNT => {
            let multiplied = a * 1000.0;
            if multiplied > MAX_REASONABLE_AMOUNT {
                Some(a)
            } else {
                Some(multiplied)
            }
        }
        _ => amount,
    }
}

/// Whether the visual fallback should run: no positive amount yet, the
/// provider is Mercado Pago, and the media is a raster image.
pub fn should_run_visual_fallback(
    amount: Option<f64>,
    provider: Option<&str>,
    mimetype: ReceiptMimeType,
) -> bool {
    let no_amount = amount.map(|a| a <= 0.0).unwrap_or(true);
    no_amount && provider == Some("Mercado Pago") && mimetype.is_raster()
}

/// Fallback entry point for the "scan whole text again" step used as the
/// safety net before the visual fallback; kept separate from
/// [`largest_grouped_amount`] so callers can choose either a BAD_CTX-aware
/// scan or a plain Amount Finder pass.
pub fn amount_finder_fallback(text: &str) -> Option<f64> {
    find_amount(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp_multiplies_sub_thousand_amount() {
        assert_eq!(
            mp_force_x1000(Some(500.0), Some("Mercado Pago"), true),
            Some(500_000.0)
        );
    }

    #[test]
    fn mp_does_not_apply_to_other_providers() {
        assert_eq!(
            mp_force_x1000(Some(500.0), Some("Galicia"), true),
            Some(500.0)
        );
    }

    #[test]
    fn mp_reverts_when_product_would_exceed_cap() {
        // 999.99 * 1000 = 999_990, under the cap, so it applies.
        assert_eq!(
            mp_force_x1000(Some(999.99), Some("Mercado Pago"), true),
            Some(999_990.0)
        );
        // A value whose product would cross 10,000,000 reverts to original.
        assert_eq!(
            mp_force_x1000(Some(999.999), Some("Mercado Pago"), true),
            Some(999.999)
        );
    }

    #[test]
    fn disabled_flag_is_noop() {
        assert_eq!(
            mp_force_x1000(Some(500.0), Some("Mercado Pago"), false),
            Some(500.0)
        );
    }

    #[test]
    fn triple_zero_hint_applies_below_threshold() {
        assert_eq!(
            triple_zero_hint(Some(150.0), "Transferencia $150 .000"),
            Some(150000.0)
        );
    }

    #[test]
    fn triple_zero_hint_ignores_amounts_at_or_above_threshold() {
        assert_eq!(
            triple_zero_hint(Some(150000.0), "Transferencia $150.000"),
            Some(150000.0)
        );
    }

    #[test]
    fn grouped_amount_rejects_cvu_shaped_tokens() {
        let text = "$ 0000003100012345678901\nMonto 15000";
        let result = largest_grouped_amount(text);
        assert_eq!(result, Some(15000.0));
    }

    #[test]
    fn visual_fallback_only_for_mp_raster() {
        assert!(should_run_visual_fallback(
            None,
            Some("Mercado Pago"),
            ReceiptMimeType::ImageJpeg
        ));
        assert!(!should_run_visual_fallback(
            None,
            Some("Mercado Pago"),
            ReceiptMimeType::ApplicationPdf
        ));
        assert!(!should_run_visual_fallback(
            None,
            Some("Galicia"),
            ReceiptMimeType::ImageJpeg
        ));
        assert!(!should_run_visual_fallback(
            Some(5000.0),
            Some("Mercado Pago"),
            ReceiptMimeType::ImageJpeg
        ));
    }
}
