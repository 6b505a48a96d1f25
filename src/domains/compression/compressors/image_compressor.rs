//! Image compression implementation

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task;

use crate::errors::{DomainError, DomainResult};
use super::Compressor;
use crate::domains::compression::orientation::{apply_orientation, read_orientation};
use crate::domains::compression::types::{CompressorOptions, ImageFile, ProgressCallback};

/// Quality decrement between encode passes.
const QUALITY_STEP: f64 = 0.05;
const MIN_QUALITY: f64 = 0.1;
const MAX_PASSES: usize = 10;

/// Compressor backed by the `image` crate.
///
/// Rotates EXIF-oriented input upright, caps the longest side at
/// `max_width_or_height`, then re-encodes with falling
/// quality until the output fits `max_size_mb` or the quality floor is reached.
/// Lossless targets (PNG, GIF, ...) get a single pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCompressor;

#[async_trait]
impl Compressor for ImageCompressor {
    async fn compress(
        &self,
        file: ImageFile,
        options: CompressorOptions,
        progress: Option<ProgressCallback>,
    ) -> DomainResult<ImageFile> {
        let cancelled = Arc::new(AtomicBool::new(false));
        // Raised when this future is dropped, e.g. by a timeout.
        let _guard = CancelOnDrop(cancelled.clone());

        let target_mime = options
            .file_type
            .clone()
            .or_else(|| file.file_type().map(str::to_string))
            .unwrap_or_else(|| "image/jpeg".to_string());
        let name = file.name;
        let data = file.bytes;

        // Run image operations in a blocking task to avoid blocking the runtime
        let (bytes, mime_type) = task::spawn_blocking(move || {
            compress_blocking(&data, &target_mime, &options, &cancelled, progress.as_ref())
        })
        .await??;

        Ok(ImageFile::new(name, mime_type, bytes))
    }

    fn compressor_name(&self) -> &'static str {
        "ImageCompressor"
    }
}

struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn report(progress: Option<&ProgressCallback>, percent: f64) {
    if let Some(callback) = progress {
        callback(percent.clamp(0.0, 100.0));
    }
}

fn compress_blocking(
    data: &[u8],
    target_mime: &str,
    options: &CompressorOptions,
    cancelled: &AtomicBool,
    progress: Option<&ProgressCallback>,
) -> DomainResult<(Vec<u8>, &'static str)> {
    report(progress, 0.0);

    let img = apply_orientation(image::load_from_memory(data)?, read_orientation(data));
    let max_side = options.max_width_or_height.max(1);
    let img = if img.width() > max_side || img.height() > max_side {
        img.resize(max_side, max_side, FilterType::Lanczos3)
    } else {
        img
    };
    report(progress, 10.0);

    let limit = options.max_size_bytes();
    let mut quality = options.initial_quality.clamp(MIN_QUALITY, 1.0);
    let mut best: Option<(Vec<u8>, &'static str)> = None;

    for pass in 0..MAX_PASSES {
        if cancelled.load(Ordering::Relaxed) {
            return Err(DomainError::Compression("compression cancelled".to_string()));
        }

        let (bytes, mime_type) = encode_for_mime(&img, target_mime, to_encoder_quality(quality))?;
        let size = bytes.len() as u64;
        let done = size <= limit || quality <= MIN_QUALITY || !is_lossy(mime_type);

        log::debug!(
            "ImageCompressor pass {} at quality {:.2}: {} bytes (limit {})",
            pass + 1,
            quality,
            size,
            limit
        );

        let smaller = best.as_ref().map_or(true, |(prev, _)| bytes.len() < prev.len());
        if smaller {
            best = Some((bytes, mime_type));
        }

        if done {
            break;
        }
        quality = (quality - QUALITY_STEP).max(MIN_QUALITY);
        report(progress, 10.0 + 90.0 * (pass + 1) as f64 / MAX_PASSES as f64);
    }

    report(progress, 100.0);
    best.ok_or_else(|| DomainError::Compression("no encode pass produced output".to_string()))
}

/// Map a `[0, 1]` quality onto the encoders' `1..=100` scale.
pub(crate) fn to_encoder_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn is_lossy(mime_type: &str) -> bool {
    matches!(mime_type, "image/jpeg" | "image/webp")
}

/// Encoder chosen for a requested mime type; PNG when there is none.
///
/// Only the registered names count, so `image/jpg` gets PNG like a canvas would.
fn output_format(mime_type: &str) -> ImageFormat {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" => ImageFormat::Jpeg,
        "image/webp" => ImageFormat::WebP,
        "image/gif" => ImageFormat::Gif,
        "image/bmp" => ImageFormat::Bmp,
        "image/tiff" => ImageFormat::Tiff,
        _ => ImageFormat::Png,
    }
}

/// Encode `img` as `mime_type` where possible.
///
/// Returns the bytes and the mime type actually written.
pub(crate) fn encode_for_mime(
    img: &DynamicImage,
    mime_type: &str,
    quality: u8,
) -> DomainResult<(Vec<u8>, &'static str)> {
    let quality = quality.clamp(1, 100);
    let mut output = Vec::new();

    let written = match output_format(mime_type) {
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
                .map_err(|e| DomainError::Image(format!("JPEG encoding error: {}", e)))?;
            "image/jpeg"
        }
        ImageFormat::WebP => encode_webp(img, quality, &mut output)?,
        format @ (ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::Tiff) => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut output), format)?;
            match format {
                ImageFormat::Gif => "image/gif",
                ImageFormat::Bmp => "image/bmp",
                _ => "image/tiff",
            }
        }
        _ => {
            encode_png(img, &mut output)?;
            "image/png"
        }
    };

    Ok((output, written))
}

fn encode_png(img: &DynamicImage, output: &mut Vec<u8>) -> DomainResult<()> {
    let png = img.to_rgba8();
    let encoder =
        PngEncoder::new_with_quality(output, CompressionType::Default, PngFilter::Adaptive);
    encoder
        .write_image(png.as_raw(), png.width(), png.height(), ColorType::Rgba8)
        .map_err(|e| DomainError::Image(format!("PNG encoding error: {}", e)))
}

#[cfg(feature = "webp")]
fn encode_webp(
    img: &DynamicImage,
    quality: u8,
    output: &mut Vec<u8>,
) -> DomainResult<&'static str> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| DomainError::Image(format!("WebP encoding error: {}", e)))?;
    let memory = encoder.encode(quality as f32);
    output.extend_from_slice(&memory);
    Ok("image/webp")
}

#[cfg(not(feature = "webp"))]
fn encode_webp(
    img: &DynamicImage,
    _quality: u8,
    output: &mut Vec<u8>,
) -> DomainResult<&'static str> {
    // Fall back to PNG
    encode_png(img, output)?;
    Ok("image/png")
}
