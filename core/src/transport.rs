//! Network-level configuration: proxy and TLS verification mode.
//!
//! # Design
//! Both settings are captured in one hashable value and applied to a single
//! `ureq` agent in one builder step, so neither can be dropped by the order
//! in which they are set. Status codes are never turned into errors by the
//! agent; non-2xx responses are returned to the caller as data.

use ureq::tls::TlsConfig;
use ureq::{Agent, Proxy};
use url::Url;

use crate::error::FetchError;

/// Proxy and TLS settings of one call. Two calls with equal configs can share
/// an agent and therefore its connection pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TransportConfig {
    pub proxy: Option<String>,
    pub insecure_skip_verify: bool,
}

impl TransportConfig {
    /// Validate a proxy URL without building anything.
    pub(crate) fn parse_proxy(raw: &str) -> Result<Proxy, FetchError> {
        let url = Url::parse(raw)
            .map_err(|e| FetchError::config_with(format!("invalid proxy url {raw:?}"), e))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(FetchError::config(format!("proxy url {raw:?} has no host")));
        }
        Proxy::new(raw).map_err(|e| FetchError::config_with(format!("unsupported proxy {raw:?}"), e))
    }

    /// Build the agent for this configuration. Without a proxy the agent
    /// connects directly and ignores proxy environment variables.
    pub fn build_agent(&self) -> Result<Agent, FetchError> {
        let proxy = self.proxy.as_deref().map(Self::parse_proxy).transpose()?;
        let tls = TlsConfig::builder()
            .disable_verification(self.insecure_skip_verify)
            .build();
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .proxy(proxy)
            .tls_config(tls)
            .build()
            .new_agent();
        Ok(agent)
    }
}
