//! Error types for the DDNS agent
//!
//! Each variant names the stage that failed so log lines read
//! "stage: cause" without further context.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS agent
#[derive(Error, Debug)]
pub enum Error {
    /// Public IP resolution errors
    #[error("IP source error: {0}")]
    IpSource(String),

    /// Address store errors
    #[error("Address store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Health listener errors
    #[error("Health listener error: {0}")]
    Listener(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Text that should have been an IPv4 literal but was not
    #[error("Invalid IPv4 address: {0:?}")]
    InvalidAddress(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create an address store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a health listener error
    pub fn listener(msg: impl Into<String>) -> Self {
        Self::Listener(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid address error carrying the offending text
    pub fn invalid_address(text: impl Into<String>) -> Self {
        Self::InvalidAddress(text.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
