#[tokio::main]
async fn main() {
    if let Err(e) = receipt_ingest::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
