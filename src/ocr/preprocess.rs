//! Optional pre-process pipeline before handing an image to the OCR engine:
//! EXIF-orient, resize to max width 1600 preserving aspect, grayscale,
//! normalize, re-encode as PNG.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

const MAX_WIDTH: u32 = 1600;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Resize (preserving aspect ratio) to at most `MAX_WIDTH` pixels wide.
fn resize_max_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, _height) = img.dimensions();
    if width <= max_width {
        return img;
    }
    let scale = max_width as f64 / width as f64;
    let new_height = (img.height() as f64 * scale).round() as u32;
    img.resize(max_width, new_height, FilterType::Lanczos3)
}

/// Stretch the intensity histogram to use the full 0-255 range.
pub fn normalize_contrast(img: &DynamicImage) -> DynamicImage {
    let mut luma = img.to_luma8();
    let (mut lo, mut hi) = (255u8, 0u8);
    for pixel in luma.pixels() {
        lo = lo.min(pixel.0[0]);
        hi = hi.max(pixel.0[0]);
    }
    if hi > lo {
        let range = (hi - lo) as f32;
        for pixel in luma.pixels_mut() {
            let stretched = (pixel.0[0] - lo) as f32 * 255.0 / range;
            pixel.0[0] = stretched.round() as u8;
        }
    }
    DynamicImage::ImageLuma8(luma)
}

/// Decode, EXIF-orient (the `image` crate honours EXIF orientation when
/// reading through [`image::io::Reader`] with format guessing enabled),
/// resize, grayscale, normalize, and re-encode as PNG.
pub fn prepare_for_ocr(bytes: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(bytes)?;
    let resized = resize_max_width(img, MAX_WIDTH);
    let gray = DynamicImage::ImageLuma8(resized.to_luma8());
    let normalized = normalize_contrast(&gray);

    let mut out = Cursor::new(Vec::new());
    normalized.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Upscale a tile so its narrow side is at least `min_width` pixels wide,
/// used before OCR-ing each tile of the visual fallback grid (§4.5).
pub fn upscale_to_min_width(img: DynamicImage, min_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width >= min_width {
        return img;
    }
    let scale = min_width as f64 / width as f64;
    let new_height = (height as f64 * scale).round() as u32;
    img.resize(min_width, new_height, FilterType::Lanczos3)
}

/// `linear(alpha, beta)`: `out = clamp(alpha * in + beta, 0, 255)`, applied
/// per-pixel on a grayscale image.
pub fn linear_adjust(img: &DynamicImage, alpha: f32, beta: f32) -> DynamicImage {
    let mut luma = img.to_luma8();
    for pixel in luma.pixels_mut() {
        let v = pixel.0[0] as f32 * alpha + beta;
        pixel.0[0] = v.clamp(0.0, 255.0) as u8;
    }
    DynamicImage::ImageLuma8(luma)
}

/// `gamma(g)`: `out = 255 * (in / 255) ^ g`.
pub fn gamma_adjust(img: &DynamicImage, gamma: f32) -> DynamicImage {
    let mut luma = img.to_luma8();
    for pixel in luma.pixels_mut() {
        let normalized = pixel.0[0] as f32 / 255.0;
        let v = 255.0 * normalized.powf(gamma);
        pixel.0[0] = v.clamp(0.0, 255.0) as u8;
    }
    DynamicImage::ImageLuma8(luma)
}

/// Simple threshold binarization: pixels below `level` become black, at or
/// above become white.
pub fn threshold(img: &DynamicImage, level: u8) -> DynamicImage {
    let mut luma = img.to_luma8();
    for pixel in luma.pixels_mut() {
        pixel.0[0] = if pixel.0[0] < level { 0 } else { 255 };
    }
    DynamicImage::ImageLuma8(luma)
}

/// Median filter over a grayscale image, used by OCR pre-process variant (b)
/// in the visual fallback (§4.5).
pub fn median_filter(img: &DynamicImage, radius: u32) -> DynamicImage {
    let luma = img.to_luma8();
    let filtered = imageproc::filter::median_filter(&luma, radius, radius);
    DynamicImage::ImageLuma8(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn solid_gray_image(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_pixel(width, height, Luma([value])))
    }

    #[test]
    fn resize_preserves_aspect_and_caps_width() {
        let img = solid_gray_image(3200, 1600, 128);
        let resized = resize_max_width(img, MAX_WIDTH);
        assert_eq!(resized.width(), MAX_WIDTH);
        assert_eq!(resized.height(), 800);
    }

    #[test]
    fn resize_is_noop_below_max_width() {
        let img = solid_gray_image(800, 400, 128);
        let resized = resize_max_width(img, MAX_WIDTH);
        assert_eq!(resized.width(), 800);
    }

    #[test]
    fn linear_adjust_clamps_to_byte_range() {
        let img = solid_gray_image(4, 4, 200);
        let adjusted = linear_adjust(&img, 2.0, 0.0);
        assert_eq!(adjusted.to_luma8().get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn threshold_binarizes() {
        let img = solid_gray_image(2, 2, 100);
        let out = threshold(&img, 150);
        assert_eq!(out.to_luma8().get_pixel(0, 0).0[0], 0);
    }
}
