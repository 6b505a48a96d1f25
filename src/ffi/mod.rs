use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use serde::{Deserialize, Serialize};
use crate::ffi::error::{FFIError, ErrorCode};

pub mod compression;
pub mod error;

pub use error::FFIResult;

/// Handles results for FFI functions that return data, serializing Ok(T) or Err(FFIError) to JSON.
/// Returns a pointer to a C string (must be freed with `upload_free_string`).
pub fn handle_json_result<F, T>(func: F) -> *mut c_char
where
    F: FnOnce() -> FFIResult<T>,
    T: Serialize,
{
    let json_string = match func() {
        Ok(value) => serde_json::to_string(&value),
        Err(ffi_error) => serde_json::to_string(&ffi_error),
    };

    let final_json = match json_string {
        Ok(s) => s,
        Err(e) => {
            // The caller must always receive parseable JSON
            let error_msg = format!("Failed to serialize result: {}", e);
            log::error!("[Rust FFI Error] {}", error_msg);
            error_json(ErrorCode::InternalError, &error_msg)
        }
    };

    into_c_string(final_json)
}

fn error_json(code: ErrorCode, message: &str) -> String {
    serde_json::json!({ "code": code, "message": message, "details": null }).to_string()
}

/// Hand ownership of `value` to the caller as a C string.
pub(crate) fn into_c_string(value: String) -> *mut c_char {
    match CString::new(value) {
        Ok(c_string) => c_string.into_raw(),
        Err(e) => {
            log::error!("[Rust FFI Error] Failed to create CString: {}", e);
            let message = format!("Failed to create CString: {}", e);
            let fallback = error_json(ErrorCode::InternalError, &message);
            CString::new(fallback).map_or(std::ptr::null_mut(), |cs| cs.into_raw())
        }
    }
}

/// Parse a JSON payload passed in from the host.
pub(crate) fn parse_json_input<T: for<'de> Deserialize<'de>>(input: *const c_char) -> FFIResult<T> {
    if input.is_null() {
        return Err(FFIError::new(ErrorCode::NullPointer, "Input JSON is null"));
    }

    let c_str = unsafe { CStr::from_ptr(input) };
    let json_str = c_str
        .to_str()
        .map_err(|_| FFIError::new(ErrorCode::InvalidUtf8, "Invalid UTF-8 in input JSON"))?;

    serde_json::from_str(json_str).map_err(|e| {
        FFIError::with_details(
            ErrorCode::InvalidArgument,
            "JSON parsing failed",
            &format!("Failed to parse JSON: {}", e),
        )
    })
}

/// Release a string previously returned by this library.
///
/// # Safety
/// `ptr` must come from this library and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn upload_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
