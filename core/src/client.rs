//! The request executor: resolve, issue exactly one call, expose the result.
//!
//! # Design
//! `RequestExecutor` owns the result of its most recent call and nothing else
//! except a cache of agents keyed by `TransportConfig`, so consecutive calls
//! through the same proxy and TLS mode reuse connections. The cache is
//! bounded by `MAX_CACHED_TRANSPORTS`, so an executor fed many distinct
//! proxies does not accumulate connection pools. Each execution
//! clears the previous result before doing anything, which makes every
//! accessor fail with `NotReady` after a failed call instead of exposing stale
//! data. `&mut self` on execution keeps one call per executor at a time;
//! independent executors share nothing.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::{is_timeout, FetchError};
use crate::http::{HttpMethod, ResponseHeaders};
use crate::plan::{resolve, ResolvedPlan};
use crate::response::{CallResult, ResponseMeta};
use crate::transport::TransportConfig;
use crate::types::RequestSpec;

/// Distinct proxy/TLS combinations kept alive per executor. Reaching the
/// limit drops every cached agent along with its idle connections.
const MAX_CACHED_TRANSPORTS: usize = 8;

#[derive(Default)]
pub struct RequestExecutor {
    agents: HashMap<TransportConfig, Agent>,
    last: Option<CallResult>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("cached_transports", &self.agents.len())
            .field("last", &self.last)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spec` and issue the call.
    pub fn execute(&mut self, spec: &RequestSpec) -> Result<&CallResult, FetchError> {
        self.last = None;
        let plan = resolve(spec)?;
        self.run(plan, None)
    }

    /// Like `execute`, but the call is abandoned once `deadline` passes.
    pub fn execute_until(
        &mut self,
        spec: &RequestSpec,
        deadline: Instant,
    ) -> Result<&CallResult, FetchError> {
        self.last = None;
        let plan = resolve(spec)?;
        self.run(plan, Some(deadline))
    }

    /// Issue the call described by an already resolved plan.
    pub fn run(
        &mut self,
        plan: ResolvedPlan,
        deadline: Option<Instant>,
    ) -> Result<&CallResult, FetchError> {
        self.last = None;

        let timeout = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(FetchError::Transport {
                        message: "deadline passed before the request was sent".to_string(),
                        source: None,
                    });
                }
                remaining.min(plan.timeout)
            }
            None => plan.timeout,
        };

        let agent = self.agent(&plan.transport)?;
        let started = Instant::now();
        debug!(method = %plan.method, uri = %plan.uri, ?timeout, "sending request");

        let mut response = send(&agent, &plan, timeout).map_err(|e| {
            let err = FetchError::from_transport(e, timeout);
            warn!(method = %plan.method, uri = %plan.uri, error = %err, "request failed");
            err
        })?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let drained = response.body_mut().read_to_vec();
        drop(response);

        let (body, outcome) = match drained {
            Ok(bytes) => (Some(bytes), Ok(())),
            Err(source) if is_timeout(&source) => {
                let err = FetchError::from_transport(source, timeout);
                warn!(status, error = %err, "response body stalled past the timeout");
                return Err(err);
            }
            Err(source) => {
                warn!(status, error = %source, "failed to read response body");
                (None, Err(FetchError::BodyRead { status, source }))
            }
        };
        debug!(
            status,
            body_len = body.as_ref().map_or(0, Vec::len),
            elapsed = ?started.elapsed(),
            "request finished"
        );

        let result = self.last.insert(CallResult {
            status,
            headers,
            body,
            warnings: plan.warnings,
        });
        outcome.map(|()| &*result)
    }

    /// The result of the last successful call.
    pub fn result(&self) -> Result<&CallResult, FetchError> {
        self.last
            .as_ref()
            .ok_or(FetchError::NotReady("no request has completed"))
    }

    /// Decode the last response body as JSON into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        self.result()?.decode()
    }

    /// Status code and headers of the last response.
    pub fn metadata(&self) -> Result<ResponseMeta, FetchError> {
        Ok(self.result()?.meta())
    }

    fn agent(&mut self, transport: &TransportConfig) -> Result<Agent, FetchError> {
        if let Some(agent) = self.agents.get(transport) {
            return Ok(agent.clone());
        }
        let agent = transport.build_agent()?;
        if self.agents.len() >= MAX_CACHED_TRANSPORTS {
            debug!(cached = self.agents.len(), "transport cache full, dropping idle agents");
            self.agents.clear();
        }
        self.agents.insert(transport.clone(), agent.clone());
        Ok(agent)
    }
}

fn send(
    agent: &Agent,
    plan: &ResolvedPlan,
    timeout: Duration,
) -> Result<ureq::http::Response<Body>, ureq::Error> {
    let uri = plan.uri.as_str();
    match plan.method {
        HttpMethod::Get => prepare(agent.get(uri), plan, timeout).call(),
        HttpMethod::Delete => prepare(agent.delete(uri), plan, timeout).call(),
        HttpMethod::Post => prepare(agent.post(uri), plan, timeout).send(plan.body.as_slice()),
        HttpMethod::Put => prepare(agent.put(uri), plan, timeout).send(plan.body.as_slice()),
        HttpMethod::Patch => prepare(agent.patch(uri), plan, timeout).send(plan.body.as_slice()),
    }
}

fn prepare<B>(mut builder: RequestBuilder<B>, plan: &ResolvedPlan, timeout: Duration) -> RequestBuilder<B> {
    for (name, value) in &plan.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.config().timeout_global(Some(timeout)).build()
}

fn collect_headers(map: &ureq::http::HeaderMap) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();
    for (name, value) in map {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}
