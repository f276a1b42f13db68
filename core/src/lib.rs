//! Declarative HTTP request helper.
//!
//! # Overview
//! A caller describes one HTTP call as a `RequestSpec` (URI, method, body,
//! headers, timeout, proxy, TLS mode). The crate runs it through three
//! stages:
//!
//! 1. **Resolve** (`plan::resolve`) turns the `RequestSpec` into a `ResolvedPlan`,
//!    applying every default without network I/O.
//! 2. **Execute** (`RequestExecutor::execute`) issues exactly one call and
//!    captures status, headers and the fully drained body.
//! 3. **Expose** (`RequestExecutor::decode` / `metadata`) projects the
//!    captured `CallResult` any number of times without re-issuing the call.
//!
//! # Design
//! - Every stage has its own `FetchError` variant so callers can branch on
//!   the failure class (`FetchError::kind`).
//! - Non-2xx responses are data, not errors.
//! - No retries and no background work; a failed call returns immediately.

pub mod client;
pub mod error;
pub mod http;
pub mod plan;
pub mod response;
pub mod transport;
pub mod types;

pub use client::RequestExecutor;
pub use error::{ErrorKind, FetchError};
pub use http::{HttpMethod, ResponseHeaders};
pub use plan::{resolve, ResolveWarning, ResolvedPlan, DEFAULT_CONTENT_TYPE, DEFAULT_TIMEOUT};
pub use response::{CallResult, ResponseMeta};
pub use transport::TransportConfig;
pub use types::RequestSpec;
