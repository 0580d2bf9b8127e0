//! Combines textual signals and amount presence into an integer score and a
//! final amount/provider pair. Monotonic by construction: every signal adds
//! a fixed non-negative weight, so adding a positive signal never lowers
//! the score (§8).

use crate::templates;
use crate::types::ScoreResult;
use lazy_static::lazy_static;
use regex::Regex;

const KNOWN_BANKS: &[&str] = &[
    "mercado pago",
    "ualá",
    "santander",
    "galicia",
    "bbva",
    "macro",
    "hsbc",
    "icbc",
    "nación",
    "bna",
    "patagonia",
    "credicoop",
    "brubank",
    "naranja x",
    "prex",
];

lazy_static! {
    static ref OP_CODE_LABEL: Regex =
        Regex::new(r"(?i)(?:operaci[oó]n|transacci[oó]n|c[oó]digo|identificaci[oó]n)\s*:").unwrap();
    static ref GROUPED_THOUSANDS: Regex =
        Regex::new(r"[1-9]\d{0,2}(?:[.,]\d{3})+").unwrap();
}

fn contains(lower: &str, needle: &str) -> bool {
    lower.contains(needle)
}

fn contains_any(lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| lower.contains(n))
}

/// Score combined (caption + OCR) text and pick the final amount/provider.
///
/// # Examples
/// ```
/// use receipt_ingest::scorer::score;
///
/// let result = score("Mercado Pago\nPagaste\n$ 15.000,00");
/// assert!(result.score >= 11);
/// assert_eq!(result.amount, Some(15000.0));
/// ```
pub fn score(text: &str) -> ScoreResult {
    let lower = text.to_lowercase();
    let mut total = 0i32;

    if contains(&lower, "comprobante de transferencia") {
        total += 2;
    }
    if contains(&lower, "enviaste") {
        total += 1;
    }
    if contains(&lower, "comprobante") {
        total += 2;
    }
    if contains(&lower, "transferencia") {
        total += 2;
    }
    if contains(&lower, "mercado pago") {
        total += 2;
    }
    if contains_any(
        &lower,
        &[
            "pagaste",
            "recibo",
            "pago realizado",
            "número de operación",
            "numero de operacion",
            "código de identificación",
            "codigo de identificacion",
        ],
    ) {
        total += 1;
    }
    if KNOWN_BANKS.iter().any(|b| lower.contains(b)) {
        total += 1;
    }

    let template = templates::parse(text);
    let finder_amount = crate::amount::find(text);
    let amount = if template.matched {
        template.amount
    } else {
        finder_amount
    };

    if amount.is_some() {
        total += 3;
    }
    if OP_CODE_LABEL.is_match(&lower) {
        total += 1;
    }
    if contains_any(&lower, &["cuit", "cvu", "cbu", "beneficiario"]) {
        total += 1;
    }
    if text.contains('$') {
        total += 1;
    }
    if GROUPED_THOUSANDS.is_match(text) && amount.map(|a| a >= 1000.0).unwrap_or(false) {
        total += 2;
    }
    if template.matched && template.amount.is_some() {
        total += 3;
    }

    // Amount selection: prefer template amount when matched; else finder.
    // If the chosen amount is < 1000 but the template can produce > 1000,
    // use the template value.
    let mut chosen = amount;
    if let Some(value) = chosen {
        if value < 1000.0 {
            if let Some(template_amount) = template.amount {
                if template_amount > 1000.0 {
                    chosen = Some(template_amount);
                }
            }
        }
    }

    ScoreResult {
        score: total,
        amount: chosen,
        provider: template.provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercado_pago_scenario() {
        let result = score("Mercado Pago\nPagaste\n$ 15.000,00\nReferencia: AB-12");
        assert!(result.score >= 11);
        assert_eq!(result.amount, Some(15000.0));
    }

    #[test]
    fn galicia_scenario() {
        let result = score("Comprobante de transferencia\nBanco Galicia\nMonto $ 7.500");
        assert!(result.score >= 9);
    }

    #[test]
    fn monotonic_in_signals() {
        let base = score("random text");
        let with_signal = score("random text comprobante");
        assert!(with_signal.score >= base.score);
    }

    #[test]
    fn no_signals_scores_zero() {
        let result = score("hola como estas");
        assert_eq!(result.score, 0);
        assert!(result.amount.is_none());
    }
}
