//! C-ABI wrapper around `fetch-core`.
//!
//! # Overview
//! Exposes the resolve/execute/expose pipeline through `extern "C"` functions
//! so any language with a C FFI can issue a request described as JSON and
//! read back the status, headers and body.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - The request description is the JSON form of `RequestSpec`, which keeps
//!   the C surface independent of the number of options.
//! - A single `FfiFetchResult` envelope conveys success payloads and errors.
//! - The C caller owns all returned pointers and must call the matching
//!   `fetch_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use fetch_core::{FetchError, RequestExecutor, RequestSpec};

use types::*;

// ---------------------------------------------------------------------------
// Executor lifecycle
// ---------------------------------------------------------------------------

/// Create a new executor. The caller must free it with `fetch_executor_free`.
/// Returns null if an internal panic occurs.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_executor_new() -> *mut FfiExecutor {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiExecutor {
            inner: RequestExecutor::new(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an executor created by `fetch_executor_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_executor_free(executor: *mut FfiExecutor) {
    if !executor.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(executor) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

/// Resolve the JSON request description `spec_json` and issue the call.
///
/// On success the result carries status, headers and body. On a body-read
/// failure it carries status and headers alongside the error.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_execute(
    executor: *mut FfiExecutor,
    spec_json: *const c_char,
) -> *mut FfiFetchResult {
    catch_unwind(AssertUnwindSafe(|| {
        if executor.is_null() {
            return FfiFetchResult::null_arg("executor");
        }
        if spec_json.is_null() {
            return FfiFetchResult::null_arg("spec_json");
        }
        let executor = unsafe { &mut *executor };
        let raw = match unsafe { CStr::from_ptr(spec_json) }.to_str() {
            Ok(raw) => raw,
            Err(e) => {
                let err = FetchError::Configuration {
                    message: "request spec is not valid UTF-8".to_string(),
                    source: Some(Box::new(e)),
                };
                return FfiFetchResult::from_error(&err, None);
            }
        };
        let spec = match RequestSpec::from_json(raw) {
            Ok(spec) => spec,
            Err(e) => return FfiFetchResult::from_error(&e, None),
        };
        match executor.inner.execute(&spec) {
            Ok(result) => FfiFetchResult::ok_call(result),
            Err(e) => {
                let meta = executor.inner.metadata().ok();
                FfiFetchResult::from_error(&e, meta.as_ref())
            }
        }
    }))
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fetch_execute"))
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

/// Status and headers of the last completed call. `NotReady` before one.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_metadata(executor: *const FfiExecutor) -> *mut FfiFetchResult {
    catch_unwind(AssertUnwindSafe(|| {
        if executor.is_null() {
            return FfiFetchResult::null_arg("executor");
        }
        let executor = unsafe { &*executor };
        match executor.inner.metadata() {
            Ok(meta) => FfiFetchResult::ok_meta(&meta),
            Err(e) => FfiFetchResult::from_error(&e, None),
        }
    }))
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fetch_metadata"))
}

/// Decode the last response body as JSON and return it re-serialized in
/// `json`. Invalid JSON yields `Decode`.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_decode_json(executor: *const FfiExecutor) -> *mut FfiFetchResult {
    catch_unwind(AssertUnwindSafe(|| {
        if executor.is_null() {
            return FfiFetchResult::null_arg("executor");
        }
        let executor = unsafe { &*executor };
        match executor.inner.decode::<serde_json::Value>() {
            Ok(value) => FfiFetchResult::ok_json(&value),
            Err(e) => FfiFetchResult::from_error(&e, None),
        }
    }))
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fetch_decode_json"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiFetchResult` returned by any `fetch_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_free_result(result: *mut FfiFetchResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        for s in [result.error_message, result.headers_json, result.json] {
            if !s.is_null() {
                drop(unsafe { CString::from_raw(s) });
            }
        }
        if !result.body.is_null() && result.body_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(result.body, result.body_len);
            drop(unsafe { Box::from_raw(slice) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fetch_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}
