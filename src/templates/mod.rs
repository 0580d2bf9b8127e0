//! Provider fingerprints and the parser that applies them. Each entry pairs
//! a `test` regex (does this text look like provider X) with an `amountLine`
//! regex (which lines are likely to carry the headline amount). Order is
//! load-bearing: entries earlier in the registry win ties, and Mercado Pago
//! must precede generic "comprobante" matchers because its screenshot
//! format is the noisiest.

use crate::numeric;
use crate::types::{CounterpartyFields, TemplateMatch};
use crate::utils::text::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::OnceLock;

struct TemplateEntry {
    provider: &'static str,
    test: fn() -> &'static Regex,
    amount_line: fn() -> &'static Regex,
}

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(mp_test, r"(?i)mercado\s*pago");
re!(mp_amount_line, r"(?i)pagaste|recibiste|\$");

re!(naranja_test, r"(?i)naranja\s*x");
re!(naranja_amount_line, r"(?i)enviaste|transferencia|\$");

re!(prex_test, r"(?i)\bprex\b");
re!(prex_amount_line, r"(?i)enviaste|pagaste|\$");

re!(uala_test, r"(?i)ual[aá]");
re!(uala_amount_line, r"(?i)enviaste|transferencia|\$");

re!(bna_test, r"(?i)banco\s*naci[oó]n|\bbna\b");
re!(bna_amount_line, r"(?i)transferencia|monto|\$");

re!(santander_test, r"(?i)santander");
re!(santander_amount_line, r"(?i)transferencia|monto|\$");

re!(galicia_test, r"(?i)galicia");
re!(galicia_amount_line, r"(?i)comprobante|monto|\$");

re!(generic_test, r"(?i)comprobante\s+de\s+transferencia|comprobante");
re!(generic_amount_line, r"(?i)monto|importe|total|\$");

fn registry() -> &'static [TemplateEntry] {
    static REGISTRY: OnceLock<Vec<TemplateEntry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        vec![
            TemplateEntry {
                provider: "Mercado Pago",
                test: mp_test,
                amount_line: mp_amount_line,
            },
            TemplateEntry {
                provider: "Naranja X",
                test: naranja_test,
                amount_line: naranja_amount_line,
            },
            TemplateEntry {
                provider: "Prex",
                test: prex_test,
                amount_line: prex_amount_line,
            },
            TemplateEntry {
                provider: "Ualá",
                test: uala_test,
                amount_line: uala_amount_line,
            },
            TemplateEntry {
                provider: "Banco Nación",
                test: bna_test,
                amount_line: bna_amount_line,
            },
            TemplateEntry {
                provider: "Santander",
                test: santander_test,
                amount_line: santander_amount_line,
            },
            TemplateEntry {
                provider: "Galicia",
                test: galicia_test,
                amount_line: galicia_amount_line,
            },
            TemplateEntry {
                provider: "Comprobante",
                test: generic_test,
                amount_line: generic_amount_line,
            },
        ]
    })
}

lazy_static! {
    static ref DOLLAR_LED: Regex = Regex::new(r"\$\s*([0-9][0-9.,\s]*)").unwrap();
    static ref CUIT_RE: Regex = Regex::new(r"\d{2}-?\d{8}-?\d").unwrap();
    static ref CVU_CBU_RE: Regex = Regex::new(r"\b\d{22}\b").unwrap();
    static ref DE_NAME: Regex = Regex::new(r"(?i)\bde:\s*([^\n]+)").unwrap();
    static ref PARA_NAME: Regex = Regex::new(r"(?i)\bpara:\s*([^\n]+)").unwrap();
}

fn extract_best_dollar_amount(text: &str) -> Option<f64> {
    DOLLAR_LED
        .captures_iter(text)
        .filter_map(|c| numeric::normalize(&c[1]))
        .fold(None, |best, v| match best {
            Some(b) if b >= v => Some(b),
            _ => Some(v),
        })
}

fn best_fields(text: &str) -> (CounterpartyFields, CounterpartyFields) {
    let cuit = CUIT_RE
        .find(text)
        .map(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).collect::<String>());
    let account = CVU_CBU_RE.find(text).map(|m| m.as_str().to_string());
    let origin_name = DE_NAME.captures(text).map(|c| c[1].trim().to_string());
    let dest_name = PARA_NAME.captures(text).map(|c| c[1].trim().to_string());

    let origin = CounterpartyFields {
        name: origin_name,
        cuit: cuit.clone(),
        account: account.clone(),
        bank: None,
    };
    let destination = CounterpartyFields {
        name: dest_name,
        cuit: None,
        account: None,
        bank: None,
    };
    (origin, destination)
}

/// Apply the template registry to normalized text, returning the first
/// provider whose fingerprint matches and yields a positive amount.
///
/// # Examples
/// ```
/// use receipt_ingest::templates::parse;
///
/// let result = parse("Mercado Pago\nPagaste\n$ 15.000,00");
/// assert!(result.matched);
/// assert_eq!(result.provider.as_deref(), Some("Mercado Pago"));
/// assert_eq!(result.amount, Some(15000.0));
/// ```
pub fn parse(text: &str) -> TemplateMatch {
    let normalized = normalize(text);

    for entry in registry() {
        if !(entry.test)().is_match(&normalized) {
            continue;
        }

        let amount_line_re = (entry.amount_line)();
        let mut best: Option<f64> = None;
        for line in normalized.lines() {
            if amount_line_re.is_match(line) || line.contains('$') {
                if let Some(v) = extract_best_dollar_amount(line).or_else(|| {
                    // amountLine may match a line that carries the value
                    // without a literal `$`, e.g. a bare grouped number.
                    crate::amount::find(line)
                }) {
                    best = Some(best.map_or(v, |b: f64| b.max(v)));
                }
            }
        }

        if best.is_none() {
            best = extract_best_dollar_amount(&normalized);
        }

        if let Some(amount) = best.filter(|a| *a > 0.0) {
            let (origin, destination) = best_fields(&normalized);
            return TemplateMatch {
                matched: true,
                provider: Some(entry.provider.to_string()),
                amount: Some(amount),
                origin,
                destination,
            };
        }
    }

    TemplateMatch::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercado_pago_precedes_generic() {
        let result = parse("Mercado Pago\nComprobante de transferencia\nPagaste\n$ 500");
        assert_eq!(result.provider.as_deref(), Some("Mercado Pago"));
    }

    #[test]
    fn galicia_matches_generic_comprobante_text() {
        let result = parse("Comprobante de transferencia\nBanco Galicia\nMonto $ 7.500");
        assert_eq!(result.provider.as_deref(), Some("Galicia"));
        assert_eq!(result.amount, Some(7500.0));
    }

    #[test]
    fn no_match_returns_unmatched() {
        let result = parse("hola como estas");
        assert!(!result.matched);
        assert!(result.amount.is_none());
    }

    #[test]
    fn extracts_cuit_from_text() {
        let result = parse("Mercado Pago\nCUIT 20-12345678-9\n$ 1.000");
        assert_eq!(result.origin.cuit.as_deref(), Some("20123456789"));
    }
}
