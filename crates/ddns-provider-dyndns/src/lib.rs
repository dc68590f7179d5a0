// # dyndns2 DNS Provider
//
// This crate implements `DnsProvider` for services speaking the dyndns2
// update protocol (DNS-O-Matic, Dyn and compatible APIs).
//
// ## Request
//
// ```http
// POST /nic/update?hostname=..&myip=..&wildcard=..&mx=..&backmx=..
// Authorization: Basic base64(username:password)
// ```
//
// No request body. Query values are URL-encoded.
//
// ## Response Classification
//
// - Transport failure or timeout: error
// - Non-2xx status: error (401/403 auth, 429 rate limit, 5xx transient)
// - 2xx body starting with `good` or `nochg`: success
// - 2xx body starting with a known failure code (`badauth`, `nohost`, ...): error
// - 2xx body that is empty or unrecognised: success, logged at WARN
//
// ## Security Requirements
//
// - The password NEVER appears in logs, errors or `Debug` output
// - One request per call; retry policy belongs to the monitor

use std::time::Duration;

use async_trait::async_trait;
use ddns_core::config::DEFAULT_UPDATE_TIMEOUT;
use ddns_core::traits::{DnsProvider, UpdateResult};
use ddns_core::{DdnsConfig, Error, PublicAddress, Result};

/// Path of the update endpoint relative to the API base
const UPDATE_PATH: &str = "/nic/update";

/// User-Agent sent with every update
const USER_AGENT: &str = concat!("ddnsd/", env!("CARGO_PKG_VERSION"));

/// Longest response excerpt carried in an error
const BODY_EXCERPT_LEN: usize = 200;

/// dyndns2 return codes that mean the update was refused
const FAILURE_CODES: &[&str] = &[
    "badauth", "notfqdn", "nohost", "numhost", "abuse", "badagent", "dnserr", "911",
];

/// Connection and record settings for a dyndns2 endpoint
#[derive(Clone)]
pub struct DynDnsSettings {
    /// Scheme and host of the API, e.g. "https://updates.dnsomatic.com"
    pub base_url: String,

    /// Hostname whose record is updated
    pub hostname: String,

    /// Account username
    pub username: String,

    /// Account password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// `wildcard` query value
    pub wildcard: String,

    /// `mx` query value
    pub mx: String,

    /// `backmx` query value
    pub backmx: String,

    /// Client-side timeout for one update request
    pub timeout: Duration,
}

impl DynDnsSettings {
    /// Settings with `NOCHG` record options and the default timeout
    pub fn new(
        base_url: impl Into<String>,
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            wildcard: "NOCHG".to_string(),
            mx: "NOCHG".to_string(),
            backmx: "NOCHG".to_string(),
            timeout: DEFAULT_UPDATE_TIMEOUT,
        }
    }

    /// Settings taken from the agent configuration
    pub fn from_config(config: &DdnsConfig) -> Self {
        Self {
            base_url: config.update_base_url(),
            hostname: config.dns_host.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            wildcard: config.wildcard.clone(),
            mx: config.mx.clone(),
            backmx: config.backmx.clone(),
            timeout: config.update_timeout,
        }
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for DynDnsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynDnsSettings")
            .field("base_url", &self.base_url)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("wildcard", &self.wildcard)
            .field("mx", &self.mx)
            .field("backmx", &self.backmx)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// dyndns2 DNS provider
///
/// Stateless and single-shot: each `update_record` call is exactly one
/// POST. The Debug implementation does NOT expose the password.
#[derive(Debug)]
pub struct DynDnsProvider {
    settings: DynDnsSettings,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl DynDnsProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `settings`: Endpoint, record and credential settings
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the username or password is empty, and
    /// `Error::Http` if the HTTP client cannot be built.
    pub fn new(settings: DynDnsSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(settings, client)
    }

    /// Create a provider that reuses an existing client
    ///
    /// The client's own timeout applies; `settings.timeout` is ignored.
    pub fn with_client(settings: DynDnsSettings, client: reqwest::Client) -> Result<Self> {
        if settings.username.is_empty() {
            return Err(Error::config("dyndns username cannot be empty"));
        }
        if settings.password.is_empty() {
            return Err(Error::config("dyndns password cannot be empty"));
        }

        Ok(Self { settings, client })
    }

    /// Create a provider from the agent configuration
    pub fn from_config(config: &DdnsConfig) -> Result<Self> {
        Self::new(DynDnsSettings::from_config(config))
    }

    /// Full URL of the update endpoint, without query
    pub fn update_url(&self) -> String {
        format!(
            "{}{}",
            self.settings.base_url.trim_end_matches('/'),
            UPDATE_PATH
        )
    }

    /// Hostname this provider updates
    pub fn hostname(&self) -> &str {
        &self.settings.hostname
    }
}

#[async_trait]
impl DnsProvider for DynDnsProvider {
    /// Publish `new_ip` for the configured hostname
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateResult::Updated)`: `good`, or an unrecognised 2xx body
    /// - `Ok(UpdateResult::Unchanged)`: `nochg`
    /// - `Err(Error)`: Transport failure, timeout, non-2xx status, a 2xx
    ///   body that could not be read in full, or a dyndns2 failure code
    async fn update_record(&self, new_ip: PublicAddress) -> Result<UpdateResult> {
        tracing::info!("Updating dyndns record: {} -> {}", self.hostname(), new_ip);

        let myip = new_ip.to_string();
        let response = self
            .client
            .post(self.update_url())
            .query(&[
                ("hostname", self.settings.hostname.as_str()),
                ("myip", myip.as_str()),
                ("wildcard", self.settings.wildcard.as_str()),
                ("mx", self.settings.mx.as_str()),
                ("backmx", self.settings.backmx.as_str()),
            ])
            .basic_auth(&self.settings.username, Some(&self.settings.password))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::provider("dyndns", format!("Update timed out: {}", e))
                } else {
                    Error::provider("dyndns", format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            tracing::debug!(status = %status, body = %excerpt(&body), "Update API responded");

            let excerpt = excerpt(&body);
            return match status.as_u16() {
                401 | 403 => Err(Error::provider(
                    "dyndns",
                    format!("Authentication failed. Status: {} - {}", status, excerpt),
                )),
                429 => Err(Error::provider(
                    "dyndns",
                    format!("Rate limit exceeded. Status: {} - {}", status, excerpt),
                )),
                500..=599 => Err(Error::provider(
                    "dyndns",
                    format!("Server error (transient): {} - {}", status, excerpt),
                )),
                _ => Err(Error::provider(
                    "dyndns",
                    format!("Update failed: {} - {}", status, excerpt),
                )),
            };
        }

        // A 2xx whose body never fully arrived is not an acknowledgement
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::provider("dyndns", format!("Update timed out: {}", e))
            } else {
                Error::provider("dyndns", format!("Failed to read response: {}", e))
            }
        })?;
        tracing::debug!(status = %status, body = %excerpt(&body), "Update API responded");

        classify_body(&body, new_ip)
    }

    fn provider_name(&self) -> &'static str {
        "dyndns"
    }
}

/// Interpret a 2xx dyndns2 response body
fn classify_body(body: &str, new_ip: PublicAddress) -> Result<UpdateResult> {
    let code = body.split_whitespace().next().unwrap_or("");

    match code {
        "good" => Ok(UpdateResult::Updated { new_ip }),
        "nochg" => Ok(UpdateResult::Unchanged { current_ip: new_ip }),
        code if FAILURE_CODES.contains(&code) => Err(Error::provider(
            "dyndns",
            format!("Update rejected: {}", excerpt(body)),
        )),
        _ => {
            tracing::warn!(
                body = %excerpt(body),
                "Unrecognised update response, assuming success"
            );
            Ok(UpdateResult::Updated { new_ip })
        }
    }
}

fn excerpt(body: &str) -> String {
    body.trim().chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DynDnsSettings {
        DynDnsSettings::new(
            "https://updates.dnsomatic.com",
            "home.example.com",
            "user",
            "super-secret",
        )
    }

    fn ip() -> PublicAddress {
        PublicAddress::from([203, 0, 113, 5])
    }

    #[test]
    fn test_empty_password_rejected() {
        let mut s = settings();
        s.password.clear();
        let err = DynDnsProvider::new(s).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let provider = DynDnsProvider::new(settings()).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_update_url() {
        let mut s = settings();
        s.base_url.push('/');
        let provider = DynDnsProvider::new(s).unwrap();
        assert_eq!(
            provider.update_url(),
            "https://updates.dnsomatic.com/nic/update"
        );
    }

    #[test]
    fn test_provider_name() {
        let provider = DynDnsProvider::new(settings()).unwrap();
        assert_eq!(provider.provider_name(), "dyndns");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(settings().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_classify_success_codes() {
        assert_eq!(
            classify_body("good 203.0.113.5", ip()).unwrap(),
            UpdateResult::Updated { new_ip: ip() }
        );
        assert_eq!(
            classify_body("nochg 203.0.113.5\n", ip()).unwrap(),
            UpdateResult::Unchanged { current_ip: ip() }
        );
    }

    #[test]
    fn test_classify_failure_codes() {
        for code in FAILURE_CODES {
            let err = classify_body(code, ip()).unwrap_err();
            assert!(err.to_string().contains(code), "{}", err);
        }
    }

    #[test]
    fn test_classify_unknown_body_is_success() {
        assert!(classify_body("", ip()).is_ok());
        assert!(classify_body("<html>ok</html>", ip()).is_ok());
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_LEN);
    }
}
