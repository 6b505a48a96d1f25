//! Pre-scaling of oversized images to a bounding box before compression.

use image::imageops::FilterType;
use std::io::Cursor;
use std::sync::Arc;
use tokio::task;

use crate::errors::{DomainError, DomainResult};
use super::compressors::image_compressor::{encode_for_mime, to_encoder_quality};
use super::orientation::{apply_orientation, displayed_dimensions, read_orientation};
use super::types::{ImageFile, PRESCALE_MAX_HEIGHT, PRESCALE_MAX_WIDTH, PRESCALE_QUALITY};

/// True when the image exceeds 1920x1080 in either dimension.
///
/// Unknown (zero) dimensions never trigger a pre-scale.
pub fn should_pre_scale(width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    width > PRESCALE_MAX_WIDTH || height > PRESCALE_MAX_HEIGHT
}

/// Largest size with the same aspect ratio that fits `max_w` x `max_h`, at least 1px per side.
pub fn scaled_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let ratio = f64::max(
        width as f64 / max_w.max(1) as f64,
        height as f64 / max_h.max(1) as f64,
    );
    let target_w = (width as f64 / ratio).floor().max(1.0) as u32;
    let target_h = (height as f64 / ratio).floor().max(1.0) as u32;
    (target_w, target_h)
}

/// Downscale `file` into the `max_w` x `max_h` box.
///
/// Whether to scale at all is decided by [`should_pre_scale`] on the displayed
/// (EXIF-oriented) dimensions. The raster is rotated upright and re-encoded at
/// quality 0.92 in the input's mime type when an encoder exists for it. Never
/// fails: anything that goes wrong hands back the input.
pub async fn pre_scale_to_box(file: ImageFile, max_w: u32, max_h: u32) -> ImageFile {
    let source = Arc::new(file);
    let worker = source.clone();

    let outcome = task::spawn_blocking(move || rasterize(&worker, max_w, max_h))
        .await
        .map_err(DomainError::from)
        .and_then(|inner| inner);

    match outcome {
        Ok(Some(scaled)) => scaled,
        Ok(None) => into_owned(source),
        Err(e) => {
            log::debug!("Pre-scale skipped for '{}': {}", source.name, e);
            into_owned(source)
        }
    }
}

fn into_owned(file: Arc<ImageFile>) -> ImageFile {
    Arc::try_unwrap(file).unwrap_or_else(|shared| (*shared).clone())
}

/// `Ok(None)` when the image already fits.
fn rasterize(file: &ImageFile, max_w: u32, max_h: u32) -> DomainResult<Option<ImageFile>> {
    let (stored_w, stored_h) = image::io::Reader::new(Cursor::new(&file.bytes))
        .with_guessed_format()
        .map_err(|e| DomainError::File(format!("Failed to read image header: {}", e)))?
        .into_dimensions()?;
    let orientation = read_orientation(&file.bytes);
    let (width, height) = displayed_dimensions(stored_w, stored_h, orientation);

    if !should_pre_scale(width, height) {
        return Ok(None);
    }

    let img = apply_orientation(image::load_from_memory(&file.bytes)?, orientation);
    let (target_w, target_h) = scaled_dimensions(width, height, max_w, max_h);
    let resized = img.resize_exact(target_w, target_h, FilterType::Triangle);

    let requested = file.file_type().unwrap_or("image/jpeg");
    let quality = to_encoder_quality(PRESCALE_QUALITY);
    let (bytes, mime_type) = encode_for_mime(&resized, requested, quality)?;

    log::debug!(
        "Pre-scaled '{}' from {}x{} (orientation {}) to {}x{} ({} -> {} bytes)",
        file.name,
        width,
        height,
        orientation,
        target_w,
        target_h,
        file.size(),
        bytes.len()
    );

    Ok(Some(ImageFile::new(file.name.clone(), mime_type, bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::compression::compressors::image_compressor::tests::encoded;
    use crate::domains::compression::orientation::tests::with_orientation;
    use image::ImageOutputFormat;

    #[test]
    fn test_should_pre_scale() {
        assert!(should_pre_scale(2000, 1000));
        assert!(should_pre_scale(1000, 1081));
        assert!(!should_pre_scale(800, 600));
        assert!(!should_pre_scale(1920, 1080));
        assert!(!should_pre_scale(0, 5000));
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(3840, 2160, 1920, 1080), (1920, 1080));
        assert_eq!(scaled_dimensions(2160, 4320, 1920, 1080), (540, 1080));
        assert_eq!(scaled_dimensions(3840, 20, 1920, 1080), (1920, 10));
        assert_eq!(scaled_dimensions(7680, 1, 1920, 1080).1, 1);
    }

    #[tokio::test]
    async fn test_wide_png_is_scaled_and_stays_png() {
        let bytes = encoded(3840, 20, ImageOutputFormat::Png);
        let file = ImageFile::new("pano.png", "image/png", bytes);
        let out = pre_scale_to_box(file, 1920, 1080).await;

        assert_eq!(out.name, "pano.png");
        assert_eq!(out.mime_type, "image/png");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1920, 10));
    }

    #[tokio::test]
    async fn test_tall_image_without_type_becomes_jpeg() {
        let file = ImageFile::new("tall", "", encoded(20, 2160, ImageOutputFormat::Png));
        let out = pre_scale_to_box(file, 1920, 1080).await;

        assert_eq!(out.mime_type, "image/jpeg");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 1080));
    }

    #[tokio::test]
    async fn test_rotated_photo_is_scaled_upright() {
        // Stored 40x2160 portrait, displayed 2160x40 landscape
        let bytes = with_orientation(&encoded(40, 2160, ImageOutputFormat::Jpeg(90)), 6);
        let file = ImageFile::new("phone.jpg", "image/jpeg", bytes);
        let out = pre_scale_to_box(file, 1920, 1080).await;

        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!(read_orientation(&out.bytes), 1);
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1920, 35));
    }

    #[tokio::test]
    async fn test_rotated_photo_within_box_untouched() {
        // Stored 1000x1500 would exceed 1080 high; displayed 1500x1000 fits
        let bytes = with_orientation(&encoded(1000, 1500, ImageOutputFormat::Jpeg(90)), 8);
        let file = ImageFile::new("phone.jpg", "image/jpeg", bytes);
        let out = pre_scale_to_box(file.clone(), 1920, 1080).await;
        assert_eq!(out, file);
    }

    #[tokio::test]
    async fn test_small_image_untouched() {
        let bytes = encoded(80, 60, ImageOutputFormat::Png);
        let file = ImageFile::new("small.png", "image/png", bytes);
        let out = pre_scale_to_box(file.clone(), 1920, 1080).await;
        assert_eq!(out, file);
    }

    #[tokio::test]
    async fn test_undecodable_input_returned_unchanged() {
        let file = ImageFile::new("broken.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00, 0x01]);
        let out = pre_scale_to_box(file.clone(), 1920, 1080).await;
        assert_eq!(out, file);
    }
}
