// # IP Source Trait
//
// Defines the interface for resolving the caller's current public address.
//
// ## Implementations
//
// - HTTP plain-text echo service: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current = source.current().await?;
//     println!("public address: {current}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::PublicAddress;

/// Trait for IP source implementations
///
/// A source answers one question per call: "what is the public address
/// right now?". It performs the network call and nothing else.
///
/// # Responsibilities
///
/// - Must not cache: freshness is the caller's responsibility
/// - Must not retry: a failed call is reported and the monitor skips the tick
/// - Must not touch the address store or the DNS provider
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(PublicAddress)`: The current public address
    /// - `Err(Error)`: Transport failure, non-success status or unparsable body
    async fn current(&self) -> Result<PublicAddress, crate::Error>;

    /// Short name used in log lines
    fn source_name(&self) -> &'static str {
        "ip-source"
    }
}
