use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::errors::{DomainError, ServiceResult};
use super::compressors::Compressor;
use super::network::{get_network_info, NetworkMonitor};
use super::policy::choose_policy;
use super::prescale::pre_scale_to_box;
use super::types::{
    CompressionOptions, CompressionPolicy, CompressionResult, CompressorOptions, ImageFile,
    NetworkInfo, PRESCALE_MAX_HEIGHT, PRESCALE_MAX_WIDTH,
};

/// Picks compression parameters for an upload and runs one compression attempt.
///
/// Holds no mutable state; concurrent `compress_one` calls are independent.
#[derive(Clone, Default)]
pub struct CompressionPlanner {
    compressor: Option<Arc<dyn Compressor>>,
    network: Option<Arc<dyn NetworkMonitor>>,
}

impl CompressionPlanner {
    /// Planner with no compressor and no network source.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(monitor);
        self
    }

    pub fn network_info(&self) -> NetworkInfo {
        get_network_info(self.network.as_deref())
    }

    /// Compress one file for upload.
    ///
    /// Without a compressor the (possibly pre-scaled) file comes back with
    /// `used_original` set. With `allow_original`, failures and outputs larger
    /// than the input resolve to the untouched input; otherwise failures are
    /// returned as errors and a larger output is kept.
    pub async fn compress_one(
        &self,
        file: ImageFile,
        options: CompressionOptions,
    ) -> ServiceResult<CompressionResult> {
        let start_time = Instant::now();
        let network_info = self.network_info();
        let policy = choose_policy(file.size(), &network_info);

        log::info!(
            "Compressing '{}' ({} bytes) with target {}MB, quality {} on network '{}'",
            file.name,
            file.size(),
            policy.max_size_mb,
            policy.initial_quality,
            network_info.effective_type
        );

        let outcome = self.run_pipeline(&file, &options, &policy).await;
        let duration_ms = elapsed_ms(start_time);

        match outcome {
            Ok((output, used_original)) => {
                log::debug!(
                    "Compression of '{}' finished in {}ms: {} -> {} bytes (original used: {})",
                    file.name,
                    duration_ms,
                    file.size(),
                    output.size(),
                    used_original
                );
                Ok(CompressionResult {
                    file: output,
                    used_original,
                    error: None,
                    policy,
                    duration_ms,
                    network_info,
                })
            }
            Err(e) if options.allow_original => {
                log::warn!("Compression of '{}' failed, uploading original: {}", file.name, e);
                Ok(CompressionResult {
                    file,
                    used_original: true,
                    error: Some(e.fallback_message()),
                    policy,
                    duration_ms,
                    network_info,
                })
            }
            Err(e) => {
                log::error!("Compression of '{}' failed: {}", file.name, e);
                Err(e)
            }
        }
    }

    /// Returns the file to upload and whether it is the original.
    async fn run_pipeline(
        &self,
        original: &ImageFile,
        options: &CompressionOptions,
        policy: &CompressionPolicy,
    ) -> ServiceResult<(ImageFile, bool)> {
        let scaled = if options.pre_scale_to_1080p {
            pre_scale_to_box(original.clone(), PRESCALE_MAX_WIDTH, PRESCALE_MAX_HEIGHT).await
        } else {
            original.clone()
        };

        let Some(compressor) = &self.compressor else {
            log::debug!("No compressor configured, passing '{}' through", original.name);
            return Ok((scaled, true));
        };

        let fallback_type = scaled
            .file_type()
            .or_else(|| original.file_type())
            .unwrap_or_default()
            .to_string();
        let compressor_options = CompressorOptions::from_policy(policy, scaled.file_type());
        let timeout_ms = options.effective_timeout_ms();

        log::debug!(
            "Handing '{}' to {} with {:?}, timeout {}ms",
            original.name,
            compressor.compressor_name(),
            compressor_options,
            timeout_ms
        );

        let compression =
            compressor.compress(scaled, compressor_options, options.on_progress.clone());
        let mut output = match timeout(Duration::from_millis(timeout_ms), compression).await {
            Ok(result) => result?,
            Err(_) => return Err(DomainError::CompressTimeout { timeout_ms }.into()),
        };

        output.name = original.name.clone();
        if output.mime_type.is_empty() {
            output.mime_type = fallback_type;
        }

        let original_size = original.size();
        if original_size > 0 && output.size() > original_size {
            if options.allow_original {
                log::info!(
                    "Compressed '{}' grew from {} to {} bytes, keeping original",
                    original.name,
                    original_size,
                    output.size()
                );
                return Ok((original.clone(), true));
            }
            log::warn!(
                "Compressed '{}' grew from {} to {} bytes, uploading it anyway",
                original.name,
                original_size,
                output.size()
            );
        }

        Ok((output, false))
    }
}

fn elapsed_ms(start_time: Instant) -> u64 {
    (start_time.elapsed().as_secs_f64() * 1000.0).round() as u64
}
