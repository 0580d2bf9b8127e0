//! Field Extractor (§4.4): carves origin/destination sections out of raw
//! receipt text and pulls name/CUIT/account/bank per side, plus the global
//! concept/transaction/reference fields. Falls back to the Template Parser
//! and Amount Finder for the amount itself.

use crate::templates;
use crate::types::{CounterpartyFields, ParsedReceipt};
use lazy_static::lazy_static;
use regex::Regex;

const ORIGIN_KEYWORDS: &[&str] = &["origen", "de", "desde", "emisor", "remitente"];
const DEST_KEYWORDS: &[&str] = &["destino", "para", "a", "beneficiario", "receptor"];
const SECTION_BOUNDARY: &[&str] = &["destino", "para", "archivo", "adjunto", "comprobante"];

lazy_static! {
    static ref NAME_LABELLED: Regex =
        Regex::new(r"(?i)(?:nombre|titular|beneficiario)\s*:\s*([^\n]+)").unwrap();
    static ref NAME_DE_PARA: Regex = Regex::new(r"(?i)\b(?:de|para|a)\s*:\s*([^\n]+)").unwrap();
    static ref DIGIT_RUN_5: Regex = Regex::new(r"\d{5,}").unwrap();
    static ref CUIT_RE: Regex = Regex::new(r"\d{2}-?\d{8}-?\d").unwrap();
    static ref ACCOUNT_22: Regex = Regex::new(r"\b\d{22}\b").unwrap();
    static ref ACCOUNT_LABELLED: Regex =
        Regex::new(r"(?i)(?:alias|cvu|cbu)\s*:\s*([a-z0-9._-]{6,})").unwrap();
    static ref ACCOUNT_FREE_ALIAS: Regex = Regex::new(r"\b[a-zA-Z][a-zA-Z0-9._-]{5,}\b").unwrap();
    static ref DIGIT_RUN_10: Regex = Regex::new(r"\d{10,}").unwrap();
    static ref BANK_FALLBACK: Regex = Regex::new(r"(?i)banco\s+([a-záéíóúñ]+)").unwrap();
    static ref CONCEPTO: Regex = Regex::new(r"(?i)concepto\s*:\s*([^\n]{1,120})").unwrap();
    static ref TRANSACTION_RE: Regex =
        Regex::new(r"(?i)(?:operaci[oó]n|transacci[oó]n|nro\s*op)\s*:?\s*([^\n]+)").unwrap();
    static ref REFERENCE_RE: Regex =
        Regex::new(r"(?i)(?:referencia|ref|c[oó]digo|cod)\s*:?\s*([^\n]+)").unwrap();
}

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

fn lookup_known_bank(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    KNOWN_BANKS
        .iter()
        .find(|bank| lower.contains(*bank))
        .map(|bank| bank.to_string())
}

fn carve_section<'a>(text: &'a str, start_keywords: &[&str]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    let start = start_keywords
        .iter()
        .filter_map(|kw| lower.find(kw))
        .min()?;

    let search_from = start + 1;
    let boundary = if search_from < lower.len() {
        SECTION_BOUNDARY
            .iter()
            .filter_map(|kw| lower[search_from..].find(kw).map(|pos| pos + search_from))
            .min()
    } else {
        None
    };

    let end = boundary.unwrap_or(text.len()).max(start);
    Some(&text[start..end])
}

fn extract_name(block: &str) -> Option<String> {
    if let Some(c) = NAME_LABELLED.captures(block) {
        return Some(c[1].trim().to_string());
    }
    if let Some(c) = NAME_DE_PARA.captures(block) {
        return Some(c[1].trim().to_string());
    }
    block
        .lines()
        .find(|line| {
            line.chars().any(|c| c.is_alphabetic()) && !DIGIT_RUN_5.is_match(line)
        })
        .map(|line| line.trim().to_string())
}

fn extract_cuit(block: &str) -> Option<String> {
    CUIT_RE
        .find(block)
        .map(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).collect())
}

fn extract_account(block: &str) -> Option<String> {
    if let Some(m) = ACCOUNT_22.find(block) {
        return Some(m.as_str().to_string());
    }
    if let Some(c) = ACCOUNT_LABELLED.captures(block) {
        return Some(c[1].to_string());
    }
    ACCOUNT_FREE_ALIAS
        .find_iter(block)
        .find(|m| !DIGIT_RUN_10.is_match(m.as_str()))
        .map(|m| m.as_str().to_string())
}

fn extract_bank(block: &str) -> Option<String> {
    lookup_known_bank(block).or_else(|| {
        BANK_FALLBACK
            .captures(block)
            .map(|c| c[1].trim().to_string())
    })
}

fn extract_block(text: &str, keywords: &[&str]) -> CounterpartyFields {
    let block = carve_section(text, keywords).unwrap_or("");
    CounterpartyFields {
        name: extract_name(block),
        cuit: extract_cuit(block),
        account: extract_account(block),
        bank: extract_bank(block),
    }
}

fn apply_global_fallbacks(
    text: &str,
    mut origin: CounterpartyFields,
    mut destination: CounterpartyFields,
) -> (CounterpartyFields, CounterpartyFields) {
    if origin.cuit.is_none() || destination.cuit.is_none() {
        let all: Vec<String> = CUIT_RE
            .find_iter(text)
            .map(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).collect())
            .collect();
        if let Some(first) = all.first() {
            if origin.cuit.is_none() {
                origin.cuit = Some(first.clone());
            }
        }
        if let Some(last) = all.last() {
            if destination.cuit.is_none() {
                destination.cuit = Some(last.clone());
            }
        }
    }

    if origin.account.is_none() || destination.account.is_none() {
        let all: Vec<String> = ACCOUNT_22.find_iter(text).map(|m| m.as_str().to_string()).collect();
        if let Some(first) = all.first() {
            if origin.account.is_none() {
                origin.account = Some(first.clone());
            }
        }
        if let Some(last) = all.last() {
            if destination.account.is_none() {
                destination.account = Some(last.clone());
            }
        }
    }

    let global_bank = lookup_known_bank(text);
    if origin.bank.is_none() {
        origin.bank = global_bank.clone();
    }
    if destination.bank.is_none() {
        destination.bank = global_bank;
    }

    (origin, destination)
}

/// Extract every Parsed Receipt field from raw combined (caption + OCR)
/// text. Amount comes from the Template Parser, falling back to the Amount
/// Finder when no template matched.
pub fn extract(text: &str) -> ParsedReceipt {
    let template = templates::parse(text);

    let amount = if template.matched {
        template.amount
    } else {
        crate::amount::find(text)
    };

    let (mut origin, mut destination) = if template.matched {
        (template.origin.clone(), template.destination.clone())
    } else {
        (
            extract_block(text, ORIGIN_KEYWORDS),
            extract_block(text, DEST_KEYWORDS),
        )
    };

    if origin == CounterpartyFields::default() {
        origin = extract_block(text, ORIGIN_KEYWORDS);
    }
    if destination == CounterpartyFields::default() {
        destination = extract_block(text, DEST_KEYWORDS);
    }

    let (origin, destination) = apply_global_fallbacks(text, origin, destination);

    let concept = CONCEPTO.captures(text).map(|c| {
        let raw = c[1].trim();
        raw.chars().take(120).collect()
    });
    let transaction = TRANSACTION_RE.captures(text).map(|c| c[1].trim().to_string());
    let reference = REFERENCE_RE.captures(text).map(|c| c[1].trim().to_string());

    ParsedReceipt {
        amount,
        provider: template.provider,
        score: 0,
        concept,
        transaction,
        reference,
        origin,
        destination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuit_extracted_and_not_confused_with_amount() {
        let text = "CUIT 20-12345678-9\nCVU 0000003100012345678901\n$ 2.345.678,90";
        let receipt = extract(text);
        assert_eq!(receipt.amount, Some(2345678.9));
        assert_eq!(receipt.origin.cuit.as_deref(), Some("20123456789"));
    }

    #[test]
    fn reference_extracted() {
        let text = "Mercado Pago\nPagaste\n$ 15.000,00\nReferencia: AB-12";
        let receipt = extract(text);
        assert_eq!(receipt.reference.as_deref(), Some("AB-12"));
        assert_eq!(receipt.amount, Some(15000.0));
    }

    #[test]
    fn concept_truncated_to_120_chars() {
        let long = "x".repeat(200);
        let text = format!("Concepto: {}", long);
        let receipt = extract(&text);
        assert_eq!(receipt.concept.unwrap().chars().count(), 120);
    }
}
