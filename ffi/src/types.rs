//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Headers cross the boundary as a JSON object string (`name -> [values]`)
//! rather than a nested pointer structure; the body crosses as a byte buffer
//! with an explicit length because it need not be UTF-8 or NUL-free.
//! Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use fetch_core::{CallResult, ErrorKind, FetchError, RequestExecutor, ResponseMeta};

/// Opaque handle to a `RequestExecutor`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiExecutor {
    pub(crate) inner: RequestExecutor,
}

/// Error codes returned in `FfiFetchResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Configuration = 1,
    Timeout = 2,
    Transport = 3,
    BodyRead = 4,
    Decode = 5,
    NotReady = 6,
    Panic = 7,
    NullArg = 8,
}

impl From<ErrorKind> for FfiErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Configuration => FfiErrorCode::Configuration,
            ErrorKind::Timeout => FfiErrorCode::Timeout,
            ErrorKind::Transport => FfiErrorCode::Transport,
            ErrorKind::BodyRead => FfiErrorCode::BodyRead,
            ErrorKind::Decode => FfiErrorCode::Decode,
            ErrorKind::NotReady => FfiErrorCode::NotReady,
        }
    }
}

/// Result envelope for every operation.
///
/// On success `error_code` is `Ok` and `error_message` is null. `status` and
/// `headers_json` are set whenever response metadata is available, which
/// includes a `BodyRead` failure. `body`/`body_len` are only set by
/// `fetch_execute`, `json` only by `fetch_decode_json`; unused pointers are
/// null.
#[repr(C)]
pub struct FfiFetchResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status: u16,
    pub headers_json: *mut c_char,
    pub body: *mut u8,
    pub body_len: usize,
    pub json: *mut c_char,
}

/// Heap-allocate a C string. Interior NUL bytes cannot be represented, so a
/// string containing one becomes empty.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

impl FfiFetchResult {
    fn empty(error_code: FfiErrorCode) -> Self {
        FfiFetchResult {
            error_code,
            error_message: std::ptr::null_mut(),
            status: 0,
            headers_json: std::ptr::null_mut(),
            body: std::ptr::null_mut(),
            body_len: 0,
            json: std::ptr::null_mut(),
        }
    }

    fn with_meta(mut self, meta: &ResponseMeta) -> Self {
        self.status = meta.status;
        let headers = serde_json::to_string(&meta.headers).unwrap_or_else(|_| "{}".to_string());
        self.headers_json = c_string(headers);
        self
    }

    /// Build a success result carrying status, headers and body.
    pub(crate) fn ok_call(result: &CallResult) -> *mut Self {
        let mut out = Self::empty(FfiErrorCode::Ok).with_meta(&result.meta());
        if let Ok(body) = result.body() {
            out.body_len = body.len();
            if !body.is_empty() {
                out.body = Box::into_raw(body.to_vec().into_boxed_slice()) as *mut u8;
            }
        }
        Box::into_raw(Box::new(out))
    }

    /// Build a success result carrying only status and headers.
    pub(crate) fn ok_meta(meta: &ResponseMeta) -> *mut Self {
        Box::into_raw(Box::new(Self::empty(FfiErrorCode::Ok).with_meta(meta)))
    }

    /// Build a success result carrying the decoded body as canonical JSON.
    pub(crate) fn ok_json(value: &serde_json::Value) -> *mut Self {
        let mut out = Self::empty(FfiErrorCode::Ok);
        out.json = c_string(value.to_string());
        Box::into_raw(Box::new(out))
    }

    /// Build an error result. `meta` is attached when the executor still has
    /// response metadata (a body-read failure).
    pub(crate) fn from_error(err: &FetchError, meta: Option<&ResponseMeta>) -> *mut Self {
        let mut out = Self::empty(err.kind().into());
        out.error_message = c_string(err.to_string());
        if let Some(meta) = meta {
            out = out.with_meta(meta);
        }
        Box::into_raw(Box::new(out))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        let mut out = Self::empty(FfiErrorCode::NullArg);
        out.error_message = c_string(format!("null argument: {name}"));
        Box::into_raw(Box::new(out))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        let mut out = Self::empty(FfiErrorCode::Panic);
        out.error_message = c_string(msg);
        Box::into_raw(Box::new(out))
    }
}
