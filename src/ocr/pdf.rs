//! PDF text extraction. Receipts are occasionally shared as a PDF export
//! rather than a screenshot; in that case OCR is skipped entirely in favour
//! of the PDF's embedded text layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf text extraction failed: {0}")]
    Extract(String),
}

/// Extract plain text from PDF bytes. Never panics on malformed PDFs; a
/// parse failure surfaces as `Err` so the caller can fall back to an empty
/// string per §4.5.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| PdfError::Extract(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_pdf_returns_err_not_panic() {
        let result = extract_text(b"not a pdf");
        assert!(result.is_err());
    }
}
