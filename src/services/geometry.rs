// src/services/geometry.rs
use crate::errors::StagingError;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::io::Cursor;

/// Letterbox padding fill. Any fixed color works; it only has to be the
/// same on every call so the operation stays deterministic.
const BACKGROUND: Rgba<u8> = Rgba([235, 235, 235, 255]);

const JPEG_QUALITY: u8 = 95;

/// Content rectangle of an image with the given original dimensions after
/// letterboxing into a `target_size` square: `(x, y, width, height)`.
///
/// The forward (letterbox) and inverse (crop) operations must share this
/// exact computation, branch included. If the two ever diverge the crop
/// leaves padding strips in every displayed result.
fn content_rect(orig_w: u32, orig_h: u32, target_size: u32) -> (u32, u32, u32, u32) {
    let aspect = orig_w as f64 / orig_h as f64;
    let (w, h) = if orig_w >= orig_h {
        // Landscape (and square): width fills the target.
        (target_size, (target_size as f64 / aspect).round() as u32)
    } else {
        (((target_size as f64) * aspect).round() as u32, target_size)
    };
    let w = w.clamp(1, target_size);
    let h = h.clamp(1, target_size);
    ((target_size - w) / 2, (target_size - h) / 2, w, h)
}

fn load(data: &[u8]) -> Result<DynamicImage, StagingError> {
    image::load_from_memory(data)
        .map_err(|e| StagingError::Decode(format!("Invalid image data: {}", e)))
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, StagingError> {
    let mut output = Vec::new();
    let mut cursor = Cursor::new(&mut output);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| StagingError::Decode(format!("Failed to encode image: {}", e)))?;
    Ok(output)
}

/// Intrinsic pixel dimensions of an encoded image.
pub fn measure_dimensions(data: &[u8]) -> Result<(u32, u32), StagingError> {
    Ok(load(data)?.dimensions())
}

/// Scales the source so its longer side equals `target_size`, centers it
/// on a `target_size` square filled with a fixed background, and
/// re-encodes as JPEG. This is the form every image takes on the wire.
pub fn letterbox_to_square(data: &[u8], target_size: u32) -> Result<Vec<u8>, StagingError> {
    let img = load(data)?;
    let (orig_w, orig_h) = img.dimensions();
    let (x, y, w, h) = content_rect(orig_w, orig_h, target_size);

    let scaled = img.resize_exact(w, h, image::imageops::FilterType::Lanczos3);

    let mut canvas = RgbaImage::from_pixel(target_size, target_size, BACKGROUND);
    image::imageops::overlay(&mut canvas, &scaled.to_rgba8(), x as i64, y as i64);

    encode_jpeg(&DynamicImage::ImageRgba8(canvas))
}

/// Inverse of [`letterbox_to_square`]: crops the centered content
/// rectangle for the original aspect ratio out of a generated square,
/// removing the padding region.
pub fn crop_to_original_aspect(
    square: &[u8],
    orig_w: u32,
    orig_h: u32,
    target_size: u32,
) -> Result<Vec<u8>, StagingError> {
    let mut img = load(square)?;
    let (sq_w, sq_h) = img.dimensions();
    if sq_w != target_size || sq_h != target_size {
        return Err(StagingError::Decode(format!(
            "Expected a {}x{} image, got {}x{}",
            target_size, target_size, sq_w, sq_h
        )));
    }

    let (x, y, w, h) = content_rect(orig_w, orig_h, target_size);
    let cropped = img.crop(x, y, w, h);

    encode_jpeg(&cropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 40, 255])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn measure_reports_intrinsic_dimensions() {
        let png = test_image(320, 200);
        assert_eq!(measure_dimensions(&png).unwrap(), (320, 200));
    }

    #[test]
    fn measure_rejects_garbage() {
        let err = measure_dimensions(b"not an image").unwrap_err();
        assert!(matches!(err, StagingError::Decode(_)));
    }

    #[test]
    fn content_rect_landscape_fills_width() {
        let (x, y, w, h) = content_rect(1600, 900, 1024);
        assert_eq!((w, h), (1024, 576));
        assert_eq!((x, y), (0, 224));
    }

    #[test]
    fn content_rect_portrait_fills_height() {
        let (x, y, w, h) = content_rect(900, 1600, 1024);
        assert_eq!((w, h), (576, 1024));
        assert_eq!((x, y), (224, 0));
    }

    #[test]
    fn content_rect_square_fills_both() {
        assert_eq!(content_rect(500, 500, 1024), (0, 0, 1024, 1024));
    }

    #[test]
    fn letterbox_output_is_target_square() {
        let out = letterbox_to_square(&test_image(1600, 900), 512).unwrap();
        assert_eq!(measure_dimensions(&out).unwrap(), (512, 512));
    }

    #[test]
    fn letterbox_then_crop_restores_aspect_ratio() {
        for (w, h) in [(1600u32, 900u32), (900, 1600), (777, 777), (1023, 512)] {
            let square = letterbox_to_square(&test_image(w, h), 512).unwrap();
            let cropped = crop_to_original_aspect(&square, w, h, 512).unwrap();
            let (cw, ch) = measure_dimensions(&cropped).unwrap();

            let original = w as f64 / h as f64;
            let restored = cw as f64 / ch as f64;
            // Rounding to whole pixels at 512px bounds the ratio error.
            assert!(
                (original - restored).abs() < 0.01,
                "{}x{} -> {}x{}: aspect {} vs {}",
                w,
                h,
                cw,
                ch,
                original,
                restored
            );
        }
    }

    #[test]
    fn crop_rejects_non_square_input() {
        let not_square = test_image(512, 256);
        let err = crop_to_original_aspect(&not_square, 1600, 900, 512).unwrap_err();
        assert!(matches!(err, StagingError::Decode(_)));
    }
}
