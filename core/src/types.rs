//! The caller-facing request description.
//!
//! # Design
//! `RequestSpec` is plain configuration: it is built either through the
//! chained setters below or loaded from JSON with camelCase keys. Nothing here
//! is validated; every defaulting and validation rule lives in the resolver so
//! a `RequestSpec` can be constructed freely and checked in one place.
//!
//! The body is stored as a `serde_json::Value`. Converting the caller's value
//! happens in `json()`, and a conversion failure is remembered rather than
//! returned so the resolver can report it as a warning and still send the
//! request.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::http::HttpMethod;

/// Declarative description of one HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub(crate) uri: String,
    #[serde(default)]
    pub(crate) method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) body: Option<serde_json::Value>,
    #[serde(skip)]
    pub(crate) body_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) content_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "secs")]
    pub(crate) timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) proxy: Option<String>,
    #[serde(default)]
    pub(crate) insecure_skip_verify: bool,
}

impl RequestSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Load a spec from its JSON form. `timeout` is given in seconds.
    pub fn from_json(raw: &str) -> Result<Self, FetchError> {
        serde_json::from_str(raw).map_err(|e| FetchError::config_with("malformed request spec", e))
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Attach a body. It is only sent for `POST`, `PUT` and `PATCH`.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.body = Some(value);
                self.body_error = None;
            }
            Err(e) => {
                self.body = None;
                self.body_error = Some(e.to_string());
            }
        }
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// A zero duration means "use the default".
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

/// `Option<Duration>` as a number of seconds.
mod secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_f64(d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        match Option::<f64>::deserialize(d)? {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid timeout {secs}: {e}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn from_json_reads_camel_case_keys() {
        let spec = RequestSpec::from_json(
            r#"{
                "uri": "https://example.test/items",
                "method": "PATCH",
                "body": {"name": "a"},
                "contentType": "text/plain",
                "headers": {"X-Trace": "1"},
                "timeout": 2.5,
                "proxy": "http://proxy.test:8080",
                "insecureSkipVerify": true
            }"#,
        )
        .unwrap();
        assert_eq!(spec.uri(), "https://example.test/items");
        assert_eq!(spec.method, HttpMethod::Patch);
        assert_eq!(spec.body(), Some(&serde_json::json!({"name": "a"})));
        assert_eq!(spec.content_type.as_deref(), Some("text/plain"));
        assert_eq!(spec.headers["X-Trace"], "1");
        assert_eq!(spec.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(spec.proxy.as_deref(), Some("http://proxy.test:8080"));
        assert!(spec.insecure_skip_verify);
    }

    #[test]
    fn from_json_defaults_optional_fields() {
        let spec = RequestSpec::from_json(r#"{"uri":"http://localhost"}"#).unwrap();
        assert_eq!(spec.method, HttpMethod::Get);
        assert!(spec.body.is_none());
        assert!(spec.headers.is_empty());
        assert!(spec.timeout.is_none());
        assert!(!spec.insecure_skip_verify);
    }

    #[test]
    fn from_json_treats_empty_method_as_get() {
        let spec = RequestSpec::from_json(r#"{"uri":"http://localhost","method":""}"#).unwrap();
        assert_eq!(spec.method, HttpMethod::Get);
    }

    #[test]
    fn from_json_rejects_unknown_method_and_negative_timeout() {
        let err = RequestSpec::from_json(r#"{"uri":"http://localhost","method":"get"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Configuration { .. }));

        let err = RequestSpec::from_json(r#"{"uri":"http://localhost","timeout":-1}"#).unwrap_err();
        assert!(matches!(err, FetchError::Configuration { .. }));
    }

    #[test]
    fn json_remembers_serialization_failure() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let spec = RequestSpec::new("http://localhost").json(&map);
        assert!(spec.body.is_none());
        assert!(spec.body_error.is_some());

        let spec = spec.json(&serde_json::json!({"ok": true}));
        assert!(spec.body_error.is_none());
    }

    #[test]
    fn later_header_with_same_name_replaces_earlier() {
        let spec = RequestSpec::new("http://localhost")
            .header("X-Id", "1")
            .header("X-Id", "2");
        assert_eq!(spec.headers.len(), 1);
        assert_eq!(spec.headers["X-Id"], "2");
    }

    #[test]
    fn spec_roundtrips_through_its_json_form() {
        let spec = RequestSpec::new("http://localhost/x")
            .method(HttpMethod::Post)
            .json(&serde_json::json!([1, 2]))
            .timeout(Duration::from_secs(7));
        let raw = serde_json::to_string(&spec).unwrap();
        assert!(raw.contains(r#""timeout":7.0"#));
        assert_eq!(RequestSpec::from_json(&raw).unwrap(), spec);
    }
}
