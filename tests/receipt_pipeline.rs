//! Integration coverage for the §8 concrete scenarios, exercising the
//! public crate API the way the CLI/router do rather than reaching into
//! private module internals.

use receipt_ingest::receipt;
use receipt_ingest::store::object_store::FsObjectStore;
use receipt_ingest::store::sqlite::SqliteRowStore;
use receipt_ingest::types::{ReceiptCandidate, ReceiptMimeType};

fn blank_image_candidate() -> ReceiptCandidate {
    ReceiptCandidate {
        mimetype: ReceiptMimeType::ImagePng,
        bytes: vec![],
        caption: None,
    }
}

async fn run_pipeline(caption: &str) -> Option<receipt_ingest::types::ParsedReceipt> {
    let store = SqliteRowStore::open_in_memory().unwrap();
    let object_store = FsObjectStore::new(std::env::temp_dir().join("receipt-ingest-tests"));
    receipt::process(
        "proj1",
        "line1",
        "5491112345",
        &blank_image_candidate(),
        Some(caption),
        &store,
        &object_store,
        "receipts",
        true,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn scenario_1_mercado_pago_dotted_amount() {
    let parsed = run_pipeline("Mercado Pago\nPagaste\n$ 15.000,00\nReferencia: AB-12")
        .await
        .expect("should be accepted");
    assert_eq!(parsed.provider.as_deref(), Some("Mercado Pago"));
    assert_eq!(parsed.amount, Some(15000.0));
    assert!(parsed.score >= 11);
    assert_eq!(parsed.reference.as_deref(), Some("AB-12"));
}

#[tokio::test]
async fn scenario_2_galicia_comprobante() {
    let parsed = run_pipeline("Comprobante de transferencia\nBanco Galicia\nMonto $ 7.500")
        .await
        .expect("should be accepted");
    assert_eq!(parsed.provider.as_deref(), Some("Galicia"));
    assert_eq!(parsed.amount, Some(7500.0));
    assert!(parsed.score >= 9);
}

#[tokio::test]
async fn scenario_3_cuit_and_cvu_not_confused_with_amount() {
    let parsed = run_pipeline("CUIT 20-12345678-9\nCVU 0000003100012345678901\n$ 2.345.678,90")
        .await
        .expect("should be accepted");
    assert_eq!(parsed.amount, Some(2345678.9));
    assert_eq!(parsed.origin.cuit.as_deref(), Some("20123456789"));
}

#[tokio::test]
async fn scenario_4_ocr_corrupted_triple_zero() {
    let parsed = run_pipeline("Transferencia $150 .000")
        .await
        .expect("should be accepted");
    assert_eq!(parsed.amount, Some(150000.0));
}

#[tokio::test]
async fn scenario_5_year_without_dollar_sign_rejected() {
    let parsed = run_pipeline("año 2024 factura 1999").await;
    assert!(parsed.is_none());
}

#[tokio::test]
async fn missing_project_id_never_persists() {
    let store = SqliteRowStore::open_in_memory().unwrap();
    let object_store = FsObjectStore::new(std::env::temp_dir().join("receipt-ingest-tests"));
    let result = receipt::process(
        "",
        "line1",
        "5491112345",
        &blank_image_candidate(),
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
