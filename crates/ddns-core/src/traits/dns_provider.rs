// # DNS Provider Trait
//
// Defines the interface for rebinding the managed hostname to a new address
// via a provider's HTTP API.
//
// ## Implementations
//
// - dyndns2 `/nic/update` protocol: `ddns-provider-dyndns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     provider.update_record("203.0.113.5".parse()?).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::PublicAddress;

/// Result of a DNS update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Provider accepted the new address
    Updated {
        /// The address now published
        new_ip: PublicAddress,
    },
    /// Provider reported the record already held this address
    Unchanged {
        /// The address already published
        current_ip: PublicAddress,
    },
}

impl UpdateResult {
    /// The address the provider now publishes
    pub fn address(&self) -> PublicAddress {
        match self {
            UpdateResult::Updated { new_ip } => *new_ip,
            UpdateResult::Unchanged { current_ip } => *current_ip,
        }
    }
}

/// Trait for DNS provider implementations
///
/// The hostname, credentials and record options are fixed at construction;
/// a call carries only the address to publish.
///
/// # Responsibilities
///
/// - One HTTP request per call, no retries or backoff (owned by `MonitorLoop`)
/// - Enforce a client-side timeout so a call never blocks indefinitely
/// - Never log or return credentials in error text
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Publish `new_ip` for the configured hostname
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateResult)`: The provider confirmed the record
    /// - `Err(Error)`: Transport failure, timeout, or a rejection by the provider
    async fn update_record(&self, new_ip: PublicAddress) -> Result<UpdateResult, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
