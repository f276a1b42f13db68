//! Resolution of a `RequestSpec` into a fully determined `ResolvedPlan`.
//!
//! # Design
//! Resolution is pure: it parses and validates, applies every default, and
//! never touches the network. Anything that would make the call impossible
//! (URI, proxy, method, header syntax) fails here with `Configuration`, so the
//! executor only sees plans it can send.

use std::time::Duration;

use tracing::{debug, warn};
use ureq::http::{HeaderName, HeaderValue};
use url::Url;

use crate::error::FetchError;
use crate::http::HttpMethod;
use crate::transport::TransportConfig;
use crate::types::RequestSpec;

/// Timeout applied when the request gives none or zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// Content type applied when the request gives none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

const CONTENT_TYPE: &str = "Content-Type";

/// Non-fatal problem found while resolving. The request is still sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// The body could not be serialized to JSON; an empty body is sent.
    BodySerialization(String),
}

/// Everything the executor needs to issue one call.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub method: HttpMethod,
    pub uri: Url,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub transport: TransportConfig,
    pub warnings: Vec<ResolveWarning>,
}

impl ResolvedPlan {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn resolve(spec: &RequestSpec) -> Result<ResolvedPlan, FetchError> {
    let uri = parse_uri(&spec.uri)?;
    let method = spec.method;

    let mut warnings = Vec::new();
    let body = if method.carries_body() {
        encode_body(spec, &mut warnings)
    } else {
        if spec.body.is_some() {
            debug!(%method, "discarding body for method without payload");
        }
        Vec::new()
    };

    let headers = merge_headers(spec)?;

    let timeout = match spec.timeout {
        Some(t) if !t.is_zero() => t,
        _ => DEFAULT_TIMEOUT,
    };

    if let Some(proxy) = spec.proxy.as_deref() {
        TransportConfig::parse_proxy(proxy)?;
    }
    let transport = TransportConfig {
        proxy: spec.proxy.clone(),
        insecure_skip_verify: spec.insecure_skip_verify,
    };

    debug!(
        %method,
        %uri,
        body_len = body.len(),
        ?timeout,
        proxied = transport.proxy.is_some(),
        insecure = transport.insecure_skip_verify,
        "resolved request"
    );

    Ok(ResolvedPlan {
        method,
        uri,
        body,
        headers,
        timeout,
        transport,
        warnings,
    })
}

fn parse_uri(raw: &str) -> Result<Url, FetchError> {
    let uri = Url::parse(raw).map_err(|e| FetchError::config_with(format!("invalid uri {raw:?}"), e))?;
    if !matches!(uri.scheme(), "http" | "https") {
        return Err(FetchError::config(format!(
            "unsupported scheme {:?} in uri {raw:?}",
            uri.scheme()
        )));
    }
    if uri.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::config(format!("no host in uri {raw:?}")));
    }
    Ok(uri)
}

fn encode_body(spec: &RequestSpec, warnings: &mut Vec<ResolveWarning>) -> Vec<u8> {
    if let Some(reason) = &spec.body_error {
        warn!(%reason, "request body is not serializable, sending empty body");
        warnings.push(ResolveWarning::BodySerialization(reason.clone()));
        return Vec::new();
    }
    let value = spec.body.as_ref().unwrap_or(&serde_json::Value::Null);
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "request body is not serializable, sending empty body");
            warnings.push(ResolveWarning::BodySerialization(e.to_string()));
            Vec::new()
        }
    }
}

/// Default content type first, then every caller header. Names compare
/// case-insensitively and the caller's entry (with its spelling) wins.
fn merge_headers(spec: &RequestSpec) -> Result<Vec<(String, String)>, FetchError> {
    let content_type = spec
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    HeaderValue::from_str(content_type)
        .map_err(|e| FetchError::config_with(format!("invalid content type {content_type:?}"), e))?;
    let mut headers = vec![(CONTENT_TYPE.to_string(), content_type.to_string())];

    for (name, value) in &spec.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::config_with(format!("invalid header name {name:?}"), e))?;
        HeaderValue::from_str(value)
            .map_err(|e| FetchError::config_with(format!("invalid value for header {name:?}"), e))?;

        match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => *slot = (name.clone(), value.clone()),
            None => headers.push((name.clone(), value.clone())),
        }
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn spec(method: HttpMethod) -> RequestSpec {
        RequestSpec::new("https://example.test/items").method(method)
    }

    #[test]
    fn get_and_delete_drop_the_body() {
        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let plan = resolve(&spec(method).json(&json!({"name": "a"}))).unwrap();
            assert!(plan.body.is_empty(), "{method}");
        }
    }

    #[test]
    fn post_put_patch_send_json() {
        for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch] {
            let body = json!({"name": "a", "tags": [1, 2]});
            let plan = resolve(&spec(method).json(&body)).unwrap();
            assert_eq!(plan.body, serde_json::to_vec(&body).unwrap(), "{method}");
        }
    }

    #[test]
    fn post_without_body_sends_json_null() {
        let plan = resolve(&spec(HttpMethod::Post)).unwrap();
        assert_eq!(plan.body, b"null");
    }

    #[test]
    fn unserializable_body_becomes_empty_with_warning() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        let plan = resolve(&spec(HttpMethod::Post).json(&map)).unwrap();
        assert!(plan.body.is_empty());
        assert!(matches!(
            plan.warnings.as_slice(),
            [ResolveWarning::BodySerialization(_)]
        ));
    }

    #[test]
    fn unserializable_body_on_get_is_not_reported() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        let plan = resolve(&spec(HttpMethod::Get).json(&map)).unwrap();
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn default_content_type_is_json() {
        let plan = resolve(&spec(HttpMethod::Get)).unwrap();
        assert_eq!(
            plan.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn content_type_override_is_used() {
        let plan = resolve(&spec(HttpMethod::Post).content_type("application/xml")).unwrap();
        assert_eq!(plan.header("content-type"), Some("application/xml"));
    }

    #[test]
    fn caller_header_wins_regardless_of_case() {
        let plan = resolve(&spec(HttpMethod::Post).header("content-type", "text/plain")).unwrap();
        assert_eq!(plan.headers.len(), 1);
        assert_eq!(plan.headers[0], ("content-type".to_string(), "text/plain".to_string()));

        let plan = resolve(&spec(HttpMethod::Post).header("Content-Type", "text/plain")).unwrap();
        assert_eq!(plan.header("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn extra_headers_are_appended() {
        let plan = resolve(
            &spec(HttpMethod::Get)
                .header("Authorization", "Bearer t")
                .header("X-Trace", "abc"),
        )
        .unwrap();
        assert_eq!(plan.headers.len(), 3);
        assert_eq!(plan.header("authorization"), Some("Bearer t"));
        assert_eq!(plan.header("x-trace"), Some("abc"));
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let err = resolve(&spec(HttpMethod::Get).header("bad header", "x")).unwrap_err();
        assert!(matches!(err, FetchError::Configuration { .. }));
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let err = resolve(&spec(HttpMethod::Get).header("X-A", "line\nbreak")).unwrap_err();
        assert!(matches!(err, FetchError::Configuration { .. }));
    }

    #[test]
    fn timeout_defaults_when_zero_or_absent() {
        assert_eq!(resolve(&spec(HttpMethod::Get)).unwrap().timeout, DEFAULT_TIMEOUT);
        let plan = resolve(&spec(HttpMethod::Get).timeout(Duration::ZERO)).unwrap();
        assert_eq!(plan.timeout, Duration::from_secs(25));
        let plan = resolve(&spec(HttpMethod::Get).timeout(Duration::from_secs(5))).unwrap();
        assert_eq!(plan.timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_uris_are_configuration_errors() {
        for uri in ["", "not a uri", "/relative/path", "http://", "file:///etc/hosts", "mailto:a@b.c"] {
            let err = resolve(&RequestSpec::new(uri)).unwrap_err();
            assert!(matches!(err, FetchError::Configuration { .. }), "{uri:?}");
        }
    }

    #[test]
    fn proxy_and_tls_mode_land_in_one_transport() {
        let plan = resolve(
            &spec(HttpMethod::Get)
                .proxy("http://proxy.test:3128")
                .insecure_skip_verify(true),
        )
        .unwrap();
        assert_eq!(plan.transport.proxy.as_deref(), Some("http://proxy.test:3128"));
        assert!(plan.transport.insecure_skip_verify);
    }

    #[test]
    fn malformed_proxy_is_rejected() {
        let err = resolve(&spec(HttpMethod::Get).proxy("::not a proxy::")).unwrap_err();
        assert!(matches!(err, FetchError::Configuration { .. }));
    }

    #[test]
    fn post_scenario_resolves_fully() {
        let plan = resolve(
            &RequestSpec::new("https://example.test/items")
                .method(HttpMethod::Post)
                .json(&json!({"name": "a"}))
                .timeout(Duration::ZERO),
        )
        .unwrap();
        assert_eq!(plan.method, HttpMethod::Post);
        assert_eq!(plan.body, br#"{"name":"a"}"#);
        assert_eq!(plan.timeout, Duration::from_secs(25));
        assert_eq!(plan.header("Content-Type"), Some("application/json"));
        assert_eq!(plan.uri.host_str(), Some("example.test"));
    }
}
