//! Receipt Pipeline (§4.7): OCR, scoring, amount-normalization, the accept
//! gate, persistence, and field extraction for one inbound receipt
//! candidate. Grounded in the teacher's `processor/stage3/counterparty.rs`
//! ordered-classifier-pipeline shape: a sequence of independent steps run in
//! a fixed order, each best-effort, with a single accept/reject gate partway
//! through.

pub mod rules;

use crate::errors::AppResult;
use crate::fields;
use crate::ocr;
use crate::scorer;
use crate::store::{ObjectStore, RowStore, object_store_path};
use crate::templates;
use crate::types::{AnalyticsConversionRow, ParsedReceipt, ReceiptCandidate};
use tracing::{info, warn};

/// Runs the full pipeline against one receipt candidate and, if accepted,
/// persists a conversion row and returns the parsed receipt. Returns `Ok(None)`
/// for a rejected candidate (§7 "Parser-inconclusive" is modeled as a
/// non-error `None`, never an `Err`).
#[allow(clippy::too_many_arguments)]
pub async fn process(
    project_id: &str,
    line_id: &str,
    contact: &str,
    candidate: &ReceiptCandidate,
    caption: Option<&str>,
    store: &dyn RowStore,
    object_store: &dyn ObjectStore,
    bucket: &str,
    mp_force_x1000_enabled: bool,
) -> AppResult<Option<ParsedReceipt>> {
    if project_id.is_empty() {
        warn!("missing project_id, dropping receipt candidate");
        return Ok(None);
    }

    // 1. OCR + combine.
    let ocr_text = ocr::text_from_media(&candidate.bytes, candidate.mimetype).await;
    let combined_text = match caption {
        Some(c) => format!("{c}\n{ocr_text}"),
        None => ocr_text,
    };

    // 2. Scorer.
    let scored = scorer::score(&combined_text);
    let mut amount = scored.amount;
    let mut score = scored.score;
    let provider = scored.provider.clone();

    // 3. Amount-normalization rules, in order; each successful rule bumps
    // score to at least 10.
    let needs_grouped_rescue = amount.map(|a| a < 1000.0).unwrap_or(true);
    if needs_grouped_rescue {
        if let Some(rescued) = rules::largest_grouped_amount(&combined_text) {
            amount = Some(rescued);
            score = score.max(10);
        }
    }

    if let Some(hinted) = rules::triple_zero_hint(amount, &combined_text) {
        if Some(hinted) != amount {
            score = score.max(10);
        }
        amount = Some(hinted);
    }

    if let Some(multiplied) =
        rules::mp_force_x1000(amount, provider.as_deref(), mp_force_x1000_enabled)
    {
        if Some(multiplied) != amount {
            score = score.max(10);
        }
        amount = Some(multiplied);
    }

    if rules::should_run_visual_fallback(amount, provider.as_deref(), candidate.mimetype) {
        if let Some(fallback_amount) =
            ocr::visual_amount_fallback(&candidate.bytes, candidate.mimetype).await
        {
            if fallback_amount > 0.0 {
                amount = Some(fallback_amount);
                score = score.max(10);

                if fallback_amount < 1000.0 {
                    if let Some(repeated) = rules::mp_force_x1000(
                        amount,
                        provider.as_deref(),
                        mp_force_x1000_enabled,
                    ) {
                        amount = Some(repeated);
                    }
                }
            }
        }
    }

    // 4. Accept gate.
    let accepted = score >= 4 && amount.map(|a| a > 0.0).unwrap_or(false);
    if !accepted {
        info!(contact, score, ?amount, "receipt rejected");
        return Ok(None);
    }
    let amount = amount.unwrap();

    // 5. Upload raw media.
    let epoch_ms = epoch_ms_placeholder();
    let path = object_store_path(project_id, contact, epoch_ms, candidate.mimetype.extension());
    let file_url = match object_store
        .upload(bucket, &path, &candidate.bytes, candidate.mimetype.as_str())
        .await
    {
        Ok(()) => object_store
            .get_public_url(bucket, &path)
            .await
            .unwrap_or(None),
        Err(err) => {
            warn!(error = %err, "media upload failed, continuing without file_url");
            None
        }
    };

    // 6. Field extraction.
    let mut parsed = fields::extract(&combined_text);
    parsed.amount = Some(amount);
    parsed.score = score;
    parsed.provider = provider.or(templates::parse(&combined_text).provider);

    // 7. Insert conversion row.
    if let Err(err) = store
        .insert_conversion(&AnalyticsConversionRow {
            project_id: project_id.to_string(),
            page_id: None,
            slug: None,
            contact: contact.to_string(),
            wa_phone: Some(contact.to_string()),
            file_url,
            file_mime: candidate.mimetype.as_str().to_string(),
            amount,
            status: "received".to_string(),
            line_id: Some(line_id.to_string()),
            concept: parsed.concept.clone(),
            reference: parsed.reference.clone(),
            operation_no: parsed.transaction.clone(),
            origin_name: parsed.origin.name.clone(),
            origin_cuit: parsed.origin.cuit.clone(),
            origin_account: parsed.origin.account.clone(),
            origin_bank: parsed.origin.bank.clone(),
            dest_name: parsed.destination.name.clone(),
            dest_cuit: parsed.destination.cuit.clone(),
            dest_account: parsed.destination.account.clone(),
            dest_bank: parsed.destination.bank.clone(),
            created_at: epoch_ms,
        })
        .await
    {
        warn!(error = %err, "failed to insert conversion row");
    }

    // 8 (agenda status=conversion) and 9 (ad event) are steps the Router
    // performs once it sees a `Some` outcome (§4.7 steps 8/9), since both
    // need contact-level state the pipeline itself doesn't own.
    Ok(Some(parsed))
}

fn epoch_ms_placeholder() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object_store::FsObjectStore;
    use crate::store::sqlite::SqliteRowStore;
    use crate::types::ReceiptMimeType;

    #[tokio::test]
    async fn rejects_when_no_positive_amount() {
        let store = SqliteRowStore::open_in_memory().unwrap();
        let object_store = FsObjectStore::new(std::env::temp_dir());
        let candidate = ReceiptCandidate {
            mimetype: ReceiptMimeType::ImagePng,
            bytes: vec![],
            caption: None,
        };

        let result = process(
            "proj1",
            "line1",
            "5491112345",
            &candidate,
            Some("año 2024 factura 1999"),
            &store,
            &object_store,
            "receipts",
            true,
        )
        .await
        .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn accepts_and_persists_conversion_from_caption_text() {
        let store = SqliteRowStore::open_in_memory().unwrap();
        let object_store = FsObjectStore::new(std::env::temp_dir());
        let candidate = ReceiptCandidate {
            mimetype: ReceiptMimeType::ImagePng,
            bytes: vec![],
            caption: None,
        };

        let result = process(
            "proj1",
            "line1",
            "5491112345",
            &candidate,
            Some("Mercado Pago\nPagaste\n$ 15.000,00\nReferencia: AB-12"),
            &store,
            &object_store,
            "receipts",
            true,
        )
        .await
        .unwrap();

        let parsed = result.expect("receipt should be accepted");
        assert_eq!(parsed.amount, Some(15000.0));
        assert!(parsed.score >= 11);
    }

    #[tokio::test]
    async fn missing_project_id_short_circuits() {
        let store = SqliteRowStore::open_in_memory().unwrap();
        let object_store = FsObjectStore::new(std::env::temp_dir());
        let candidate = ReceiptCandidate {
            mimetype: ReceiptMimeType::ImagePng,
            bytes: vec![],
            caption: None,
        };

        let result = process(
            "",
            "line1",
            "5491112345",
            &candidate,
            Some("Mercado Pago\n$ 15.000,00"),
            &store,
            &object_store,
            "receipts",
            true,
        )
        .await
        .unwrap();

        assert!(result.is_none());
    }
}
