//! Shared domain types that cross module boundaries: line state, receipt
//! candidates/results, and the row shapes persisted through [`crate::store`].

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single WhatsApp line. See [`crate::session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Initializing,
    Loading,
    Qr,
    Authenticated,
    Ready,
    Disconnected,
    Restarting,
    Error,
    /// HTTP-surface-only state; never produced by the session state machine
    /// itself, but a valid value in the `lines` row (§6).
    Connected,
    /// HTTP-surface-only state set by `POST /lines/:id/start`.
    QrReady,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Initializing => "initializing",
            LineStatus::Loading => "loading",
            LineStatus::Qr => "qr",
            LineStatus::Authenticated => "authenticated",
            LineStatus::Ready => "ready",
            LineStatus::Disconnected => "disconnected",
            LineStatus::Restarting => "restarting",
            LineStatus::Error => "error",
            LineStatus::Connected => "connected",
            LineStatus::QrReady => "qr_ready",
        }
    }
}

/// Media types the receipt pipeline will attempt to parse. Anything else
/// skips the pipeline entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceiptMimeType {
    #[serde(rename = "image/jpeg")]
    ImageJpeg,
    #[serde(rename = "image/png")]
    ImagePng,
    #[serde(rename = "image/webp")]
    ImageWebp,
    #[serde(rename = "application/pdf")]
    ApplicationPdf,
}

impl ReceiptMimeType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::ImageJpeg),
            "image/png" => Some(Self::ImagePng),
            "image/webp" => Some(Self::ImageWebp),
            "application/pdf" => Some(Self::ApplicationPdf),
            _ => None,
        }
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::ApplicationPdf)
    }

    /// File extension used when building the object-store path.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::ImageJpeg => "jpg",
            Self::ImagePng => "png",
            Self::ImageWebp => "webp",
            Self::ApplicationPdf => "pdf",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageJpeg => "image/jpeg",
            Self::ImagePng => "image/png",
            Self::ImageWebp => "image/webp",
            Self::ApplicationPdf => "application/pdf",
        }
    }
}

/// An ephemeral receipt candidate extracted from one inbound message.
#[derive(Debug, Clone)]
pub struct ReceiptCandidate {
    pub mimetype: ReceiptMimeType,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// One side of a transfer (`origin` or `destination`); every field is
/// best-effort and may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CounterpartyFields {
    pub name: Option<String>,
    pub cuit: Option<String>,
    pub account: Option<String>,
    pub bank: Option<String>,
}

/// Result of the Template Registry / Parser (§4.3).
#[derive(Debug, Clone, Default)]
pub struct TemplateMatch {
    pub matched: bool,
    pub provider: Option<String>,
    pub amount: Option<f64>,
    pub origin: CounterpartyFields,
    pub destination: CounterpartyFields,
}

/// Output of the Scorer (§4.6).
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub score: i32,
    pub amount: Option<f64>,
    pub provider: Option<String>,
}

/// Fully parsed receipt, as produced by the Field Extractor and carried
/// through the Receipt Pipeline.
#[derive(Debug, Clone, Default)]
pub struct ParsedReceipt {
    pub amount: Option<f64>,
    pub provider: Option<String>,
    pub score: i32,
    pub concept: Option<String>,
    pub transaction: Option<String>,
    pub reference: Option<String>,
    pub origin: CounterpartyFields,
    pub destination: CounterpartyFields,
}

impl ParsedReceipt {
    /// Acceptance gate from §3/§4.7: `score >= 4 && amount > 0`.
    pub fn is_accepted(&self) -> bool {
        self.score >= 4 && self.amount.map(|a| a > 0.0).unwrap_or(false)
    }
}

// --- Row shapes (§6). Column names are contractual. ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRow {
    pub id: String,
    pub project_id: String,
    pub status: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappSessionRow {
    pub line_id: String,
    pub project_id: String,
    pub wa_status: String,
    pub wa_phone: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsChatRow {
    pub project_id: String,
    pub page_id: Option<String>,
    pub slug: Option<String>,
    pub line_id: Option<String>,
    pub wa_phone: Option<String>,
    pub contact: String,
    pub message: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaContactNameRow {
    pub project_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaRow {
    pub project_id: String,
    pub contact: String,
    pub wa_phone: Option<String>,
    pub source_slug: Option<String>,
    pub source_page_id: Option<String>,
    pub status: String,
    pub last_message_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsLeadRow {
    pub project_id: String,
    pub contact: String,
    pub wa_phone: Option<String>,
    pub source_slug: Option<String>,
    pub source_page_id: Option<String>,
    pub page_id: Option<String>,
    pub slug: Option<String>,
    pub first_message: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConversionRow {
    pub project_id: String,
    pub page_id: Option<String>,
    pub slug: Option<String>,
    pub contact: String,
    pub wa_phone: Option<String>,
    pub file_url: Option<String>,
    pub file_mime: String,
    pub amount: f64,
    pub status: String,
    pub line_id: Option<String>,
    pub concept: Option<String>,
    pub reference: Option<String>,
    pub operation_no: Option<String>,
    pub origin_name: Option<String>,
    pub origin_cuit: Option<String>,
    pub origin_account: Option<String>,
    pub origin_bank: Option<String>,
    pub dest_name: Option<String>,
    pub dest_cuit: Option<String>,
    pub dest_account: Option<String>,
    pub dest_bank: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRow {
    pub id: String,
    pub slug: String,
    pub project_id: String,
    pub fb_pixel_id: Option<String>,
    pub fb_access_token: Option<String>,
    pub fb_test_event_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_gate_requires_score_and_positive_amount() {
        let mut receipt = ParsedReceipt {
            score: 4,
            amount: Some(1.0),
            ..Default::default()
        };
        assert!(receipt.is_accepted());

        receipt.score = 3;
        assert!(!receipt.is_accepted());

        receipt.score = 4;
        receipt.amount = Some(0.0);
        assert!(!receipt.is_accepted());

        receipt.amount = None;
        assert!(!receipt.is_accepted());
    }

    #[test]
    fn mimetype_roundtrip() {
        assert_eq!(
            ReceiptMimeType::from_mime("image/png"),
            Some(ReceiptMimeType::ImagePng)
        );
        assert_eq!(ReceiptMimeType::from_mime("text/plain"), None);
        assert_eq!(ReceiptMimeType::ImagePng.extension(), "png");
    }
}
