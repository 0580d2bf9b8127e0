#![allow(dead_code)]

use thiserror::Error;

/// Application-wide error type - single point of truth.
///
/// Only `Config` is fatal (§7): everything else is logged at the call site
/// and absorbed, because the receipt/router pipeline is built to degrade
/// gracefully rather than propagate failures to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration issues - the only fatal error kind (§7)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// OCR/image/PDF pipeline errors - always logged and absorbed, never
    /// propagated (Parser-inconclusive, §7)
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Base64 decoding (service-role JWT payload)
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Outbound HTTP client errors (ad event emitter)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application-wide result type - single point of truth.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}
