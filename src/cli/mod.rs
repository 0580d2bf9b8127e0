use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Receipt-recognition pipeline for a WhatsApp-based marketing tracker.
#[derive(Parser)]
#[command(name = "receipt-ingest")]
#[command(about = "OCR, template classification and scoring for Argentine payment receipts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands. Each exercises one core entry point that an HTTP
/// handler would otherwise call directly (no HTTP server ships in this
/// crate, §1 Non-goals).
#[derive(Subcommand)]
pub enum Commands {
    /// Normalize an OCR'd numeric token to a float
    Normalize(commands::normalize::NormalizeCommand),
    /// Find the most likely monetary amount in a block of text
    FindAmount(commands::amount::FindAmountCommand),
    /// Run the Template Registry/Parser against a block of text
    Template(commands::template::TemplateCommand),
    /// Run the Scorer against a block of text
    Score(commands::score::ScoreCommand),
    /// Extract text from an image or PDF via the OCR driver
    Ocr(commands::ocr::OcrCommand),
    /// Run the full Receipt Pipeline against a media file
    Pipeline(commands::pipeline::PipelineCommand),
}

pub async fn run() -> AppResult<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize(command) => command.run(),
        Commands::FindAmount(command) => command.run(),
        Commands::Template(command) => command.run(),
        Commands::Score(command) => command.run(),
        Commands::Ocr(command) => command.run().await,
        Commands::Pipeline(command) => command.run().await,
    }
}
