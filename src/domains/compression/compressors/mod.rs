//! Compressors the planner can delegate to

pub mod image_compressor;

use async_trait::async_trait;
use std::path::Path;

use crate::errors::DomainResult;
use super::types::{CompressorOptions, ImageFile, ProgressCallback};

/// Common trait for all compressors
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Compress `file` towards `options.max_size_mb`, reporting progress in percent.
    async fn compress(
        &self,
        file: ImageFile,
        options: CompressorOptions,
        progress: Option<ProgressCallback>,
    ) -> DomainResult<ImageFile>;

    /// Name used in logs
    fn compressor_name(&self) -> &'static str;
}

/// Utility function to get file extension from filename
pub fn get_extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Utility function to guess MIME type from extension
pub fn guess_mime_type(filename: &str) -> &'static str {
    match get_extension(filename).unwrap_or("").to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "heic" | "heif" => "image/heic",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
