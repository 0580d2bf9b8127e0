//! Tiled visual-amount fallback, used only when the textual pipeline yields
//! no usable amount and the provider is Mercado Pago: extract the header
//! region of the screenshot, tile it, and OCR each tile under several
//! pre-process variants looking for a headline `$` amount.

use crate::numeric;
use crate::ocr::engine;
use crate::ocr::preprocess;
use image::{DynamicImage, GenericImageView};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

const ROI_X0: f64 = 0.04;
const ROI_X1: f64 = 0.70;
const ROI_Y0: f64 = 0.08;
const ROI_Y1: f64 = 0.48;
const GRID_COLS: u32 = 4;
const GRID_ROWS: u32 = 6;
const PAD_X_FRAC: f64 = 0.08;
const PAD_Y_FRAC: f64 = 0.04;
const MIN_TILE_SIDE: u32 = 16;
const MIN_TILE_UPSCALE_WIDTH: u32 = 600;
const TILE_WHITELIST: &str = "0-9$., ";

#[derive(Debug, Error)]
pub enum VisualFallbackError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

lazy_static! {
    static ref DOLLAR_AMOUNT: Regex =
        Regex::new(r"\$\s*([0-9][0-9.,\s\u{00A0}\u{202F}]*)").unwrap();
    static ref TRIPLE_ZERO_LIKE: Regex =
        Regex::new(r"(?i)\.(000|00o|0o0|oo0)(?:\D|$)").unwrap();
}

struct Tile {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

fn region_of_interest(width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x0 = (width as f64 * ROI_X0).round() as u32;
    let x1 = (width as f64 * ROI_X1).round() as u32;
    let y0 = (height as f64 * ROI_Y0).round() as u32;
    let y1 = (height as f64 * ROI_Y1).round() as u32;
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

fn build_tiles(roi_width: u32, roi_height: u32, image_width: u32, image_height: u32) -> Vec<Tile> {
    let pad_x = (image_width as f64 * PAD_X_FRAC).round() as i64;
    let pad_y = (image_height as f64 * PAD_Y_FRAC).round() as i64;
    let cell_w = roi_width / GRID_COLS;
    let cell_h = roi_height / GRID_ROWS;

    let mut tiles = Vec::with_capacity((GRID_COLS * GRID_ROWS) as usize);
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let cell_x = (col * cell_w) as i64 - pad_x;
            let cell_y = (row * cell_h) as i64 - pad_y;
            let cell_x2 = ((col + 1) * cell_w) as i64 + pad_x;
            let cell_y2 = ((row + 1) * cell_h) as i64 + pad_y;

            let x = cell_x.max(0) as u32;
            let y = cell_y.max(0) as u32;
            let x2 = (cell_x2.max(0) as u32).min(roi_width);
            let y2 = (cell_y2.max(0) as u32).min(roi_height);

            if x2 <= x || y2 <= y {
                continue;
            }
            let width = x2 - x;
            let height = y2 - y;
            if width <= MIN_TILE_SIDE || height <= MIN_TILE_SIDE {
                continue;
            }
            tiles.push(Tile { x, y, width, height });
        }
    }
    tiles
}

fn normalize_candidate(raw: &str, had_triple_zero_hint: bool) -> Option<f64> {
    let value = DOLLAR_AMOUNT
        .captures(raw)
        .and_then(|c| numeric::normalize(&c[1]))
        .or_else(|| crate::amount::find(raw));
    value.map(|v| {
        if had_triple_zero_hint && v < 1000.0 {
            v * 1000.0
        } else {
            v
        }
    })
}

fn ocr_tile_variants(tile_img: &DynamicImage) -> Vec<String> {
    let upscaled = preprocess::upscale_to_min_width(tile_img.clone(), MIN_TILE_UPSCALE_WIDTH);

    let variant_a = {
        let gray = DynamicImage::ImageLuma8(upscaled.to_luma8());
        let normalized = preprocess::normalize_contrast(&gray);
        preprocess::linear_adjust(&normalized, 1.35, -18.0)
    };
    let variant_b = {
        let gray = DynamicImage::ImageLuma8(upscaled.to_luma8());
        let normalized = preprocess::normalize_contrast(&gray);
        let median = preprocess::median_filter(&normalized, 1);
        let linear = preprocess::linear_adjust(&median, 1.5, -20.0);
        preprocess::threshold(&linear, 150)
    };
    let variant_c = {
        let gray = DynamicImage::ImageLuma8(upscaled.to_luma8());
        let normalized = preprocess::normalize_contrast(&gray);
        let linear = preprocess::linear_adjust(&normalized, 1.8, -25.0);
        preprocess::gamma_adjust(&linear, 0.9)
    };

    let mut texts = Vec::new();
    for variant in [&variant_a, &variant_b, &variant_c] {
        for psm in [6u32, 7u32] {
            if let Ok(text) = engine::recognize_text_with_psm(variant, TILE_WHITELIST, psm) {
                texts.push(text);
            }
        }
    }
    texts
}

/// Extract the maximum positive amount found across the tiled header
/// region, or `None` if nothing usable was recognized.
pub fn extract_amount(bytes: &[u8]) -> Result<Option<f64>, VisualFallbackError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    let (roi_x, roi_y, roi_w, roi_h) = region_of_interest(width, height);
    let roi = img.crop_imm(roi_x, roi_y, roi_w, roi_h);

    let tiles = build_tiles(roi_w, roi_h, width, height);

    // Collect every tile's recognized text before normalizing any of them:
    // the triple-zero hint is a property of the whole header (it can show
    // up in a sibling tile to the one carrying the digits), not just the
    // single tile a candidate came from.
    let mut all_texts = Vec::new();
    for tile in &tiles {
        let tile_img = roi.crop_imm(tile.x, tile.y, tile.width, tile.height);
        all_texts.extend(ocr_tile_variants(&tile_img));
    }

    let triple_zero_hint = all_texts.iter().any(|t| TRIPLE_ZERO_LIKE.is_match(t));

    let mut best: Option<f64> = None;
    for text in &all_texts {
        if let Some(value) = normalize_candidate(text, triple_zero_hint) {
            if value > 0.0 {
                best = Some(best.map_or(value, |b: f64| b.max(value)));
            }
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_of_interest_geometry() {
        let (x, y, w, h) = region_of_interest(1000, 1000);
        assert_eq!(x, 40);
        assert_eq!(y, 80);
        assert_eq!(w, 660);
        assert_eq!(h, 400);
    }

    #[test]
    fn tiles_reject_small_slivers() {
        let tiles = build_tiles(40, 40, 1000, 1000);
        assert!(tiles.iter().all(|t| t.width > MIN_TILE_SIDE && t.height > MIN_TILE_SIDE));
    }

    #[test]
    fn grid_produces_up_to_24_tiles() {
        let tiles = build_tiles(800, 1200, 1000, 1000);
        assert!(tiles.len() <= (GRID_COLS * GRID_ROWS) as usize);
        assert!(!tiles.is_empty());
    }

    #[test]
    fn triple_zero_hint_multiplies_small_value() {
        assert_eq!(normalize_candidate("$ 12", true), Some(12000.0));
        assert_eq!(normalize_candidate("$ 12", false), Some(12.0));
    }
}
