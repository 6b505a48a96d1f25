//! Type definitions for the compression domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use crate::errors::{DomainError, ValidationError};

/// Default deadline for a single compressor call.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Longest side handed to the compressor.
pub const COMPRESSOR_MAX_WIDTH_OR_HEIGHT: u32 = 1920;

/// Bounding box used when pre-scaling.
pub const PRESCALE_MAX_WIDTH: u32 = 1920;
pub const PRESCALE_MAX_HEIGHT: u32 = 1080;

/// Encoder quality used for the pre-scaled raster.
pub const PRESCALE_QUALITY: f64 = 0.92;

/// Coarse network class reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EffectiveType {
    #[default]
    Unknown,
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
}

impl EffectiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveType::Unknown => "",
            EffectiveType::Slow2g => "slow-2g",
            EffectiveType::TwoG => "2g",
            EffectiveType::ThreeG => "3g",
            EffectiveType::FourG => "4g",
        }
    }

    /// Lenient parse: anything unrecognised is `Unknown`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(EffectiveType::Unknown)
    }
}

impl FromStr for EffectiveType {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Ok(EffectiveType::Unknown),
            "slow-2g" => Ok(EffectiveType::Slow2g),
            "2g" => Ok(EffectiveType::TwoG),
            "3g" => Ok(EffectiveType::ThreeG),
            "4g" => Ok(EffectiveType::FourG),
            _ => Err(DomainError::Validation(ValidationError::custom(
                &format!("Invalid effective type: {}", s)
            )))
        }
    }
}

impl fmt::Display for EffectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EffectiveType {
    fn from(value: String) -> Self {
        EffectiveType::parse_lenient(&value)
    }
}

impl From<EffectiveType> for String {
    fn from(value: EffectiveType) -> Self {
        value.as_str().to_string()
    }
}

/// Snapshot of network conditions, captured once per compression attempt.
///
/// The default value is what a platform without a network-information API reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(default)]
    pub effective_type: EffectiveType,
    #[serde(default)]
    pub save_data: bool,
    #[serde(default)]
    pub downlink: Option<f64>,
    #[serde(default)]
    pub rtt: Option<f64>,
}

impl NetworkInfo {
    pub fn new(effective_type: EffectiveType, save_data: bool) -> Self {
        Self {
            effective_type,
            save_data,
            downlink: None,
            rtt: None,
        }
    }

    /// Save-data requested or a 3g-or-slower link.
    pub fn is_constrained(&self) -> bool {
        self.save_data
            || matches!(
                self.effective_type,
                EffectiveType::Slow2g | EffectiveType::TwoG | EffectiveType::ThreeG
            )
    }
}

/// Target size and starting quality for one compression attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    pub max_size_mb: f64,
    pub initial_quality: f64, // 0.0 - 1.0
}

/// An in-memory image file, the unit of work for the planner.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFile {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
            last_modified: Utc::now(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Mime type, or `None` when the file carries none.
    pub fn file_type(&self) -> Option<&str> {
        if self.mime_type.is_empty() {
            None
        } else {
            Some(&self.mime_type)
        }
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Progress callback, receives a percentage in `0.0..=100.0`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Options handed to a compressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorOptions {
    pub max_width_or_height: u32,
    pub max_size_mb: f64,
    pub initial_quality: f64,
    pub file_type: Option<String>,
}

impl CompressorOptions {
    pub fn from_policy(policy: &CompressionPolicy, file_type: Option<&str>) -> Self {
        Self {
            max_width_or_height: COMPRESSOR_MAX_WIDTH_OR_HEIGHT,
            max_size_mb: policy.max_size_mb,
            initial_quality: policy.initial_quality,
            file_type: file_type.map(str::to_string),
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb * 1024.0 * 1024.0) as u64
    }
}

/// Per-call options for `compress_one`
#[derive(Clone)]
pub struct CompressionOptions {
    pub timeout_ms: u64,
    pub allow_original: bool,
    pub pre_scale_to_1080p: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            allow_original: false,
            pre_scale_to_1080p: true,
            on_progress: None,
        }
    }
}

impl fmt::Debug for CompressionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionOptions")
            .field("timeout_ms", &self.timeout_ms)
            .field("allow_original", &self.allow_original)
            .field("pre_scale_to_1080p", &self.pre_scale_to_1080p)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl CompressionOptions {
    /// Defaults overridden by `UPLOAD_COMPRESS_TIMEOUT_MS`,
    /// `UPLOAD_COMPRESS_ALLOW_ORIGINAL` and `UPLOAD_COMPRESS_PRESCALE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: env::var("UPLOAD_COMPRESS_TIMEOUT_MS")
                .ok()
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(defaults.timeout_ms),
            allow_original: env::var("UPLOAD_COMPRESS_ALLOW_ORIGINAL")
                .ok()
                .and_then(|val| parse_flag(&val))
                .unwrap_or(defaults.allow_original),
            pre_scale_to_1080p: env::var("UPLOAD_COMPRESS_PRESCALE")
                .ok()
                .and_then(|val| parse_flag(&val))
                .unwrap_or(defaults.pre_scale_to_1080p),
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Zero means "not set" and falls back to the default deadline.
    pub fn effective_timeout_ms(&self) -> u64 {
        if self.timeout_ms == 0 {
            DEFAULT_TIMEOUT_MS
        } else {
            self.timeout_ms
        }
    }
}

/// Accepts the usual spellings of a boolean env flag.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Outcome of one `compress_one` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    pub file: ImageFile,
    pub used_original: bool,
    pub error: Option<String>,
    pub policy: CompressionPolicy,
    pub duration_ms: u64,
    pub network_info: NetworkInfo,
}
