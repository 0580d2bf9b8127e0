use crate::errors::{AppError, AppResult};
use crate::store::object_store::FsObjectStore;
use crate::store::sqlite::SqliteRowStore;
use crate::types::{ReceiptCandidate, ReceiptMimeType};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct PipelineCommand {
    /// Path to an image (jpeg/png/webp) or PDF file
    path: PathBuf,

    /// Optional caption text that accompanied the media
    #[arg(long)]
    caption: Option<String>,

    /// Project id to attribute the receipt to
    #[arg(long, default_value = "cli-project")]
    project_id: String,

    /// Contact phone number
    #[arg(long, default_value = "5491100000000")]
    contact: String,
}

impl PipelineCommand {
    pub async fn run(&self) -> AppResult<()> {
        let bytes = std::fs::read(&self.path).map_err(AppError::Io)?;
        let mimetype = mimetype_from_extension(&self.path).ok_or_else(|| {
            AppError::InvalidData(format!(
                "unrecognized file extension: {}",
                self.path.display()
            ))
        })?;

        let candidate = ReceiptCandidate {
            mimetype,
            bytes,
            caption: self.caption.clone(),
        };

        let store = SqliteRowStore::open_in_memory()?;
        let object_store = FsObjectStore::new(std::env::temp_dir().join("receipt-ingest-cli"));

        let outcome = crate::receipt::process(
            &self.project_id,
            "cli-line",
            &self.contact,
            &candidate,
            self.caption.as_deref(),
            &store,
            &object_store,
            "receipts",
            true,
        )
        .await?;

        match outcome {
            Some(parsed) => {
                println!("accepted");
                println!("amount: {:?}", parsed.amount);
                println!("provider: {:?}", parsed.provider);
                println!("score: {}", parsed.score);
                println!("origin: {:?}", parsed.origin);
                println!("destination: {:?}", parsed.destination);
            }
            None => println!("rejected"),
        }
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
