//! Turns image/PDF bytes into text. Two entry points: [`text_from_media`]
//! for the textual pipeline, and [`visual_amount_fallback`] for the
//! tiled-region fallback used only when the textual pipeline fails on a
//! Mercado Pago screenshot.

pub mod engine;
pub mod pdf;
pub mod preprocess;
pub mod visual_fallback;

use crate::types::ReceiptMimeType;
use tracing::warn;

/// Extract text from a receipt's raw bytes. Errors never propagate to the
/// caller: any failure is logged and an empty string is returned, matching
/// the Parser-inconclusive outcome class (§7).
pub async fn text_from_media(bytes: &[u8], mimetype: ReceiptMimeType) -> String {
    if mimetype == ReceiptMimeType::ApplicationPdf {
        return match pdf::extract_text(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!("pdf text extraction failed: {e}");
                String::new()
            }
        };
    }

    let prepared = match preprocess::prepare_for_ocr(bytes) {
        Ok(png_bytes) => png_bytes,
        Err(e) => {
            warn!("image preprocessing unavailable, using original bytes: {e}");
            bytes.to_vec()
        }
    };

    let bytes_owned = prepared;
    let result = tokio::task::spawn_blocking(move || engine::recognize_text(&bytes_owned)).await;

    match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("ocr engine failed: {e}");
            String::new()
        }
        Err(e) => {
            warn!("ocr task panicked: {e}");
            String::new()
        }
    }
}

/// Tiled visual-amount fallback for Mercado Pago screenshots whose textual
/// OCR pass yielded no usable amount. See [`visual_fallback::extract_amount`].
pub async fn visual_amount_fallback(bytes: &[u8], mimetype: ReceiptMimeType) -> Option<f64> {
    if !mimetype.is_raster() {
        return None;
    }
    let bytes_owned = bytes.to_vec();
    match tokio::task::spawn_blocking(move || visual_fallback::extract_amount(&bytes_owned)).await
    {
        Ok(Ok(amount)) => amount,
        Ok(Err(e)) => {
            warn!("visual amount fallback failed: {e}");
            None
        }
        Err(e) => {
            warn!("visual amount fallback task panicked: {e}");
            None
        }
    }
}
