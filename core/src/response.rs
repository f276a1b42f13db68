//! Captured outcome of one executed call.
//!
//! # Design
//! A `CallResult` is data only: every accessor is a projection of what the
//! executor captured, so reading it any number of times never re-issues the
//! request. The body is `None` when draining it failed after the status line
//! arrived; status and headers are still valid in that case.

use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::http::ResponseHeaders;
use crate::plan::ResolveWarning;

/// Status code and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: ResponseHeaders,
}

#[derive(Debug, Clone)]
pub struct CallResult {
    pub(crate) status: u16,
    pub(crate) headers: ResponseHeaders,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) warnings: Vec<ResolveWarning>,
}

impl CallResult {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// First value of a header. Names are stored lower-cased, so the lookup
    /// ignores case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Raw body bytes.
    pub fn body(&self) -> Result<&[u8], FetchError> {
        self.body
            .as_deref()
            .ok_or(FetchError::NotReady("response body was not captured"))
    }

    /// Decode the body as JSON into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_slice(self.body()?)?)
    }

    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    /// Non-fatal problems found while resolving the request that produced
    /// this result.
    pub fn warnings(&self) -> &[ResolveWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ack {
        ok: bool,
    }

    fn result(status: u16, body: Option<&str>) -> CallResult {
        let mut headers = ResponseHeaders::new();
        headers.insert(
            "set-cookie".to_string(),
            vec!["a=1".to_string(), "b=2".to_string()],
        );
        CallResult {
            status,
            headers,
            body: body.map(|b| b.as_bytes().to_vec()),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn decode_into_matching_shape() {
        let ack: Ack = result(200, Some(r#"{"ok":true}"#)).decode().unwrap();
        assert_eq!(ack, Ack { ok: true });
    }

    #[test]
    fn decode_into_incompatible_shape_is_decode_error() {
        let err = result(200, Some(r#"{"ok":"yes"}"#)).decode::<Ack>().unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));

        let err = result(200, Some("")).decode::<Ack>().unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn missing_body_is_not_ready() {
        let r = result(200, None);
        assert!(matches!(r.body(), Err(FetchError::NotReady(_))));
        assert!(matches!(r.decode::<Ack>(), Err(FetchError::NotReady(_))));
        assert_eq!(r.status(), 200);
    }

    #[test]
    fn header_lookup_ignores_case_and_keeps_all_values() {
        let r = result(204, Some(""));
        assert_eq!(r.header("Set-Cookie"), Some("a=1"));
        assert_eq!(r.headers()["set-cookie"], vec!["a=1", "b=2"]);
        assert_eq!(r.header("x-missing"), None);
    }

    #[test]
    fn meta_projects_status_and_headers() {
        let r = result(404, Some("gone"));
        let meta = r.meta();
        assert_eq!(meta.status, 404);
        assert_eq!(meta.headers, *r.headers());
        assert!(!r.is_success());
        assert_eq!(r.body().unwrap(), b"gone");
    }
}
