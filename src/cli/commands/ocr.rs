use crate::errors::{AppError, AppResult};
use crate::types::ReceiptMimeType;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct OcrCommand {
    /// Path to an image (jpeg/png/webp) or PDF file
    path: PathBuf,
}

impl OcrCommand {
    pub async fn run(&self) -> AppResult<()> {
        let bytes = std::fs::read(&self.path).map_err(AppError::Io)?;
        let mimetype = mimetype_from_extension(&self.path).ok_or_else(|| {
            AppError::InvalidData(format!(
                "unrecognized file extension: {}",
                self.path.display()
            ))
        })?;

        let text = crate::ocr::text_from_media(&bytes, mimetype).await;
        println!("{text}");
        Ok(())
    }
}

fn mimetype_from_extension(path: &PathBuf) -> Option<ReceiptMimeType> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(ReceiptMimeType::ImageJpeg),
        "png" => Some(ReceiptMimeType::ImagePng),
        "webp" => Some(ReceiptMimeType::ImageWebp),
        "pdf" => Some(ReceiptMimeType::ApplicationPdf),
        _ => None,
    }
}
