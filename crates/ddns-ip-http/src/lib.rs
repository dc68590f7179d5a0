// # HTTP IP Source
//
// This crate resolves the agent's public IPv4 address by asking a plain-text
// echo service (`GET http://{basehost}/`) what address the request came from.
//
// ## Behavior
//
// - One GET per call, no caching and no retries
// - Any non-2xx status is an error carrying the status code; the body is
//   not parsed
// - A 2xx body must be an IPv4 literal after trimming whitespace
//
// ## Timeouts
//
// No overall request timeout is set. A hung resolver stalls the tick that
// called it, and the monitor's fixed schedule absorbs the delay.

use async_trait::async_trait;
use ddns_core::traits::IpSource;
use ddns_core::{DdnsConfig, Error, PublicAddress, Result};

/// User-Agent sent with every lookup
const USER_AGENT: &str = concat!("ddnsd/", env!("CARGO_PKG_VERSION"));

/// IP source backed by an HTTP echo service
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// Endpoint returning the caller's address as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint to GET (e.g. "http://myip.dnsomatic.com/")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, client))
    }

    /// Create a source that reuses an existing client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Create a source for the configured resolver host
    pub fn from_config(config: &DdnsConfig) -> Result<Self> {
        Self::new(config.resolver_url())
    }

    /// Endpoint this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<PublicAddress> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        tracing::debug!(url = %self.url, status = %status, "Resolver responded");

        if !status.is_success() {
            return Err(Error::ip_source(format!(
                "unsuccessful status code returned from API: {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        PublicAddress::parse(&body)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
