//! Wraps the tesseract OCR engine. Kept as a synchronous function so the
//! caller can run it on a blocking thread pool (§5: OCR must not stall the
//! cooperative event loop).

use rusty_tesseract::{Args, Image};
use thiserror::Error;

/// Character whitelist for the textual pipeline (§4.5).
const WHITELIST: &str = "0-9A-Za-z$.,:-/ ";
const LANGUAGE: &str = "spa+eng";

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract invocation failed: {0}")]
    Tesseract(String),
}

fn tesseract_args(whitelist: &str, lang: &str, psm: Option<u32>) -> Args {
    let mut config = std::collections::HashMap::new();
    config.insert(
        "tessedit_char_whitelist".to_string(),
        whitelist.to_string(),
    );
    Args {
        lang: lang.to_string(),
        config_variables: config,
        dpi: Some(300),
        psm,
        oem: Some(3),
    }
}

/// Run OCR over pre-processed PNG bytes using the `spa+eng` language pack
/// and the `0-9A-Za-z$.,:-/ ` whitelist.
pub fn recognize_text(png_bytes: &[u8]) -> Result<String, OcrError> {
    let image =
        Image::from_dynamic_image(&image::load_from_memory(png_bytes).map_err(|e| {
            OcrError::Tesseract(format!("could not decode preprocessed image: {e}"))
        })?)
        .map_err(|e| OcrError::Tesseract(e.to_string()))?;

    let args = tesseract_args(WHITELIST, LANGUAGE, None);
    rusty_tesseract::image_to_string(&image, &args).map_err(|e| OcrError::Tesseract(e.to_string()))
}

/// Run OCR over an already-decoded image with an explicit page-segmentation
/// mode, used by the visual amount fallback tiles (§4.5: PSM 6 and 7).
pub fn recognize_text_with_psm(
    img: &image::DynamicImage,
    whitelist: &str,
    psm: u32,
) -> Result<String, OcrError> {
    let image = Image::from_dynamic_image(img).map_err(|e| OcrError::Tesseract(e.to_string()))?;
    let args = tesseract_args(whitelist, LANGUAGE, Some(psm));
    rusty_tesseract::image_to_string(&image, &args).map_err(|e| OcrError::Tesseract(e.to_string()))
}
