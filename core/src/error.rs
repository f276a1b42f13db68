//! Error types for the request pipeline.
//!
//! # Design
//! Each stage surfaces its own variant so callers can branch on the failure
//! class: `Configuration` is raised before any network I/O, `Timeout` and
//! `Transport` come out of the call itself, `BodyRead` means the status line
//! and headers arrived but the body did not, and `Decode` / `NotReady` belong
//! to the accessors. `ErrorKind` is the `Copy` discriminant used for branching
//! and for the FFI error code.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the resolver, the executor and the response accessors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request description is unusable (bad URI, proxy, method or header).
    /// No call was attempted.
    #[error("invalid request configuration: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The call did not complete within the applied timeout.
    #[error("request timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        #[source]
        source: ureq::Error,
    },

    /// Connection, DNS, TLS or cancellation failure.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<ureq::Error>,
    },

    /// The response head was received but draining the body failed.
    #[error("failed to read response body (status {status})")]
    BodyRead {
        status: u16,
        #[source]
        source: ureq::Error,
    },

    /// The captured body could not be decoded into the requested type.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// An accessor was used before a successful execution.
    #[error("no response available: {0}")]
    NotReady(&'static str),
}

/// Failure class of a `FetchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Timeout,
    Transport,
    BodyRead,
    Decode,
    NotReady,
}

impl ErrorKind {
    /// Whether re-issuing the same request may succeed. Retrying is always
    /// left to the caller.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Transport)
    }
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Configuration { .. } => ErrorKind::Configuration,
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::Transport { .. } => ErrorKind::Transport,
            FetchError::BodyRead { .. } => ErrorKind::BodyRead,
            FetchError::Decode(_) => ErrorKind::Decode,
            FetchError::NotReady(_) => ErrorKind::NotReady,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        FetchError::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn config_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FetchError::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Classify an error returned by the transport while issuing the call.
    pub(crate) fn from_transport(err: ureq::Error, timeout: Duration) -> Self {
        if is_timeout(&err) {
            FetchError::Timeout {
                timeout,
                source: err,
            }
        } else {
            FetchError::Transport {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

/// Whether the transport gave up because a deadline expired.
pub(crate) fn is_timeout(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Timeout(_) => true,
        ureq::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
        _ => false,
    }
}
