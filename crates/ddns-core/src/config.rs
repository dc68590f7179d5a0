//! Configuration types for the DDNS agent
//!
//! The agent is configured from a flat set of `DDNS_`-prefixed variables,
//! either taken from the process environment or from a dotenv file. The
//! daemon decides which source to read; this module turns the key/value
//! pairs into a validated [`DdnsConfig`].
//!
//! | Variable | Field | Required |
//! |----------|-------|----------|
//! | `DDNS_BASEHOST` | host of the public-IP echo service | yes |
//! | `DDNS_UPDHOST` | host of the update API | yes |
//! | `DDNS_UN` / `DDNS_PW` | account credentials | yes |
//! | `DDNS_DNSHOST` | hostname to update | yes |
//! | `DDNS_WILDCARD` | wildcard flag value | yes |
//! | `DDNS_MX` / `DDNS_BACKMX` | mail-exchanger values | yes |
//! | `DDNS_DBPATH` | address file path | yes |
//! | `DDNS_INTERVAL` | poll interval (`5m`, `90s`, `300`) | yes |
//! | `DDNS_DEBUG` | debug logging | no |
//! | `DDNS_PERSIST_POLICY` | `always` or `on_success` | no |
//! | `DDNS_HEALTH_ADDR` | health listener address | no |
//! | `DDNS_UPDATE_TIMEOUT` | update request timeout | no |

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "DDNS_";

/// Default address of the health listener
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:9376";

/// Default timeout for a DNS update request
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do with the address store when the DNS update fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// Persist the new address even if the update failed
    ///
    /// The failed update is not retried until the address changes again,
    /// but an unreachable provider never sees an update storm.
    #[default]
    Always,

    /// Persist only after the provider confirmed the update
    ///
    /// The next tick sees a mismatch and retries the update.
    OnSuccess,
}

impl FromStr for PersistPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(Self::Always),
            "on_success" => Ok(Self::OnSuccess),
            other => Err(Error::config(format!(
                "DDNS_PERSIST_POLICY '{}' is not valid. Valid values: always, on_success",
                other
            ))),
        }
    }
}

impl fmt::Display for PersistPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistPolicy::Always => f.write_str("always"),
            PersistPolicy::OnSuccess => f.write_str("on_success"),
        }
    }
}

/// Main DDNS configuration
///
/// Immutable for the process lifetime. Built once at startup and passed
/// to the components that need it.
#[derive(Clone)]
pub struct DdnsConfig {
    /// Host of the plain-text public-IP service
    pub base_host: String,

    /// Host of the dyndns2 update API
    pub update_host: String,

    /// Account username
    pub username: String,

    /// Account password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// Hostname whose record is updated
    pub dns_host: String,

    /// Wildcard flag value passed through to the provider
    pub wildcard: String,

    /// Primary mail-exchanger value
    pub mx: String,

    /// Backup mail-exchanger value
    pub backmx: String,

    /// Path of the address file
    pub db_path: PathBuf,

    /// Poll interval
    pub interval: Duration,

    /// Enable debug logging
    pub debug: bool,

    /// Address store policy after a failed update
    pub persist_policy: PersistPolicy,

    /// Address the health listener binds to
    pub health_addr: SocketAddr,

    /// Client-side timeout for update requests
    pub update_timeout: Duration,
}

// Custom Debug implementation that hides the password
impl fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("base_host", &self.base_host)
            .field("update_host", &self.update_host)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("dns_host", &self.dns_host)
            .field("wildcard", &self.wildcard)
            .field("mx", &self.mx)
            .field("backmx", &self.backmx)
            .field("db_path", &self.db_path)
            .field("interval", &self.interval)
            .field("debug", &self.debug)
            .field("persist_policy", &self.persist_policy)
            .field("health_addr", &self.health_addr)
            .field("update_timeout", &self.update_timeout)
            .finish()
    }
}

impl DdnsConfig {
    /// Build a configuration from key/value pairs
    ///
    /// Only keys starting with [`ENV_PREFIX`] are considered; the remainder
    /// of the key is matched case-insensitively. The result is validated.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.as_ref()
                    .strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_ascii_lowercase(), v.into()))
            })
            .collect();

        let required = |key: &str| -> Result<String, Error> {
            match vars.get(key).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(Error::config(format!(
                    "{}{} is required",
                    ENV_PREFIX,
                    key.to_ascii_uppercase()
                ))),
            }
        };
        let optional = |key: &str| -> Option<&str> {
            vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
        };

        let interval_text = required("interval")?;
        let interval = parse_duration(&interval_text).map_err(|e| {
            Error::config(format!("DDNS_INTERVAL '{}' is not valid: {}", interval_text, e))
        })?;

        let debug = match optional("debug") {
            Some(v) => parse_bool(v)
                .ok_or_else(|| Error::config(format!("DDNS_DEBUG '{}' is not a boolean", v)))?,
            None => false,
        };

        let persist_policy = match optional("persist_policy") {
            Some(v) => v.parse()?,
            None => PersistPolicy::default(),
        };

        let health_addr_text = optional("health_addr").unwrap_or(DEFAULT_HEALTH_ADDR);
        let health_addr = health_addr_text.parse().map_err(|e| {
            Error::config(format!(
                "DDNS_HEALTH_ADDR '{}' is not a socket address: {}",
                health_addr_text, e
            ))
        })?;

        let update_timeout = match optional("update_timeout") {
            Some(v) => parse_duration(v).map_err(|e| {
                Error::config(format!("DDNS_UPDATE_TIMEOUT '{}' is not valid: {}", v, e))
            })?,
            None => DEFAULT_UPDATE_TIMEOUT,
        };

        // Password is deliberately not trimmed
        let password = match vars.get("pw") {
            Some(v) if !v.is_empty() => v.clone(),
            _ => return Err(Error::config("DDNS_PW is required")),
        };

        let config = Self {
            base_host: required("basehost")?,
            update_host: required("updhost")?,
            username: required("un")?,
            password,
            dns_host: required("dnshost")?,
            wildcard: required("wildcard")?,
            mx: required("mx")?,
            backmx: required("backmx")?,
            db_path: PathBuf::from(required("dbpath")?),
            interval,
            debug,
            persist_policy,
            health_addr,
            update_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        validate_host("DDNS_BASEHOST", &self.base_host)?;
        validate_host("DDNS_UPDHOST", &self.update_host)?;
        validate_host("DDNS_DNSHOST", &self.dns_host)?;

        if self.username.is_empty() {
            return Err(Error::config("DDNS_UN cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::config("DDNS_PW cannot be empty"));
        }
        for (name, value) in [
            ("DDNS_WILDCARD", &self.wildcard),
            ("DDNS_MX", &self.mx),
            ("DDNS_BACKMX", &self.backmx),
        ] {
            if value.is_empty() {
                return Err(Error::config(format!("{} cannot be empty", name)));
            }
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(Error::config("DDNS_DBPATH cannot be empty"));
        }
        if self.interval.is_zero() {
            return Err(Error::config("DDNS_INTERVAL must be > 0"));
        }
        if self.update_timeout.is_zero() {
            return Err(Error::config("DDNS_UPDATE_TIMEOUT must be > 0"));
        }

        Ok(())
    }

    /// URL of the public-IP echo service
    pub fn resolver_url(&self) -> String {
        format!("http://{}/", self.base_host)
    }

    /// Scheme and host of the update API, without path
    pub fn update_base_url(&self) -> String {
        format!("https://{}", self.update_host)
    }
}

fn validate_host(name: &str, host: &str) -> Result<(), Error> {
    if host.is_empty() {
        return Err(Error::config(format!("{} cannot be empty", name)));
    }
    if host.contains("://") {
        return Err(Error::config(format!(
            "{} must be a bare host without a scheme. Got: {}",
            name, host
        )));
    }
    if host.contains('/') || host.chars().any(char::is_whitespace) {
        return Err(Error::config(format!(
            "{} must be a bare host (no path or whitespace). Got: {}",
            name, host
        )));
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration string
///
/// Supports:
/// - Go-style unit sequences: "250ms", "90s", "5m", "1h30m"
/// - A bare integer, read as seconds: "300"
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();

    if input.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("missing unit in '{}'", input))?;
        if digits_end == 0 {
            return Err(format!("expected a number in '{}'", input));
        }
        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|e| format!("invalid number in '{}': {}", input, e))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let part = match unit {
            "ns" => Duration::from_nanos(value),
            "us" | "µs" => Duration::from_micros(value),
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            other => return Err(format!("unknown unit '{}' in '{}'", other, input)),
        };
        total = total.saturating_add(part);
    }

    Ok(total)
}
