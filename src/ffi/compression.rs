// =============================================================================
// UPLOAD COMPRESSION – FFI BINDINGS
// =============================================================================
// Exposes the compression planner to a host app. JSON payloads in, JSON out.
//
// MEMORY OWNERSHIP:
// - The host owns input JSON strings (read-only in Rust)
// - Rust owns output strings (the host must call upload_free_string)
// - All strings are UTF-8, null-terminated
//
// JSON CONTRACTS:
// - get_network_info: ConnectionSnapshot, or a null pointer when the platform has no API
// - choose_target_max_size_mb: {"original_bytes": n, "network_info": NetworkInfo?}
// - choose_initial_quality: {"network_info": NetworkInfo?}
// - compress_one: {"file": ImageFile, "options": {...}?, "connection": ConnectionSnapshot?,
//                  "use_compressor": bool?}
//   ImageFile bytes are base64.
// -----------------------------------------------------------------------------

use crate::domains::compression::{
    choose_initial_quality, choose_target_max_size_mb, get_network_info, CompressionOptions,
    CompressionPlanner, ConnectionSnapshot, ImageCompressor, ImageFile, NetworkInfo,
    StaticNetworkMonitor,
};
use crate::ffi::error::{ErrorCode, FFIError};
use crate::ffi::{handle_json_result, into_c_string, parse_json_input, FFIResult};
use crate::utils::format_bytes;
use serde::Deserialize;
use std::os::raw::{c_char, c_int};
use std::sync::Arc;
use tokio::runtime::Runtime;

// -----------------------------------------------------------------------------
// DTO Types for JSON Deserialization -------------------------------------------
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct TargetSizeRequest {
    original_bytes: u64,
    #[serde(default)]
    network_info: Option<NetworkInfo>,
}

#[derive(Deserialize)]
struct QualityRequest {
    #[serde(default)]
    network_info: Option<NetworkInfo>,
}

#[derive(Deserialize, Default)]
struct OptionsPayload {
    timeout_ms: Option<u64>,
    allow_original: Option<bool>,
    pre_scale_to_1080p: Option<bool>,
}

impl From<OptionsPayload> for CompressionOptions {
    fn from(payload: OptionsPayload) -> Self {
        let defaults = CompressionOptions::default();
        Self {
            timeout_ms: payload.timeout_ms.unwrap_or(defaults.timeout_ms),
            allow_original: payload.allow_original.unwrap_or(defaults.allow_original),
            pre_scale_to_1080p: payload.pre_scale_to_1080p.unwrap_or(defaults.pre_scale_to_1080p),
            on_progress: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct CompressOneRequest {
    file: ImageFile,
    #[serde(default)]
    options: Option<OptionsPayload>,
    #[serde(default)]
    connection: Option<ConnectionSnapshot>,
    #[serde(default = "default_true")]
    use_compressor: bool,
}

fn write_result(result: *mut *mut c_char, json_result: *mut c_char) -> c_int {
    if !result.is_null() {
        unsafe { *result = json_result };
    }
    if json_result.is_null() {
        ErrorCode::InternalError as c_int
    } else {
        ErrorCode::Success as c_int
    }
}

// -----------------------------------------------------------------------------
// FFI Functions ----------------------------------------------------------------
// -----------------------------------------------------------------------------

/// Format a byte count; a negative count stands for "missing" and yields "".
/// Output: plain string (not JSON)
#[unsafe(no_mangle)]
pub extern "C" fn upload_format_bytes(bytes: i64) -> *mut c_char {
    let value = u64::try_from(bytes).ok();
    into_c_string(format_bytes(value))
}

/// Normalize a raw connection snapshot
/// Input: ConnectionSnapshot JSON, or null when no network API exists
/// Output: NetworkInfo JSON
#[unsafe(no_mangle)]
pub unsafe extern "C" fn upload_get_network_info(
    payload_json: *const c_char,
    result: *mut *mut c_char,
) -> c_int {
    let json_result = handle_json_result(|| -> FFIResult<NetworkInfo> {
        if payload_json.is_null() {
            return Ok(get_network_info(None));
        }
        let snapshot: ConnectionSnapshot = parse_json_input(payload_json)?;
        let monitor = StaticNetworkMonitor::new(Some(snapshot));
        Ok(get_network_info(Some(&monitor)))
    });
    write_result(result, json_result)
}

/// Input: {"original_bytes": n, "network_info": NetworkInfo?}
/// Output: {"max_size_mb": f64}
#[unsafe(no_mangle)]
pub unsafe extern "C" fn upload_choose_target_max_size_mb(
    payload_json: *const c_char,
    result: *mut *mut c_char,
) -> c_int {
    let json_result = handle_json_result(|| -> FFIResult<serde_json::Value> {
        let request: TargetSizeRequest = parse_json_input(payload_json)?;
        let network_info = request.network_info.unwrap_or_default();
        let max_size_mb = choose_target_max_size_mb(request.original_bytes, &network_info);
        Ok(serde_json::json!({ "max_size_mb": max_size_mb }))
    });
    write_result(result, json_result)
}

/// Input: {"network_info": NetworkInfo?}
/// Output: {"initial_quality": f64}
#[unsafe(no_mangle)]
pub unsafe extern "C" fn upload_choose_initial_quality(
    payload_json: *const c_char,
    result: *mut *mut c_char,
) -> c_int {
    let json_result = handle_json_result(|| -> FFIResult<serde_json::Value> {
        let request: QualityRequest = parse_json_input(payload_json)?;
        let network_info = request.network_info.unwrap_or_default();
        Ok(serde_json::json!({ "initial_quality": choose_initial_quality(&network_info) }))
    });
    write_result(result, json_result)
}

/// Compress one file with the built-in image compressor
/// Input: CompressOneRequest JSON
/// Output: CompressionResult JSON
#[unsafe(no_mangle)]
pub unsafe extern "C" fn upload_compress_one(
    payload_json: *const c_char,
    result: *mut *mut c_char,
) -> c_int {
    let json_result = handle_json_result(|| -> FFIResult<_> {
        let request: CompressOneRequest = parse_json_input(payload_json)?;

        let mut planner = CompressionPlanner::new()
            .with_network_monitor(Arc::new(StaticNetworkMonitor::new(request.connection)));
        if request.use_compressor {
            planner = planner.with_compressor(Arc::new(ImageCompressor));
        }
        let options: CompressionOptions = request.options.unwrap_or_default().into();

        let rt = Runtime::new().map_err(|e| {
            FFIError::with_details(
                ErrorCode::InternalError,
                "Failed to create async runtime",
                &e.to_string(),
            )
        })?;

        rt.block_on(async {
            planner.compress_one(request.file, options).await.map_err(FFIError::from)
        })
    });
    write_result(result, json_result)
}
