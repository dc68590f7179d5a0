// # Address Store Trait
//
// Defines the interface for the durable "last known public address" cell.
//
// ## Purpose
//
// The store lets the monitor skip DNS updates when nothing changed and makes
// the loop crash-resumable: after a restart, behavior depends only on what
// the store holds.
//
// ## Implementations
//
// - File-based: single file holding the dotted-decimal text
// - In-memory: for embedding and tests
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* AddressStore implementation */;
//
//     store.ensure_exists().await?;
//     if store.read().await?.is_none() {
//         store.write("203.0.113.5".parse()?).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::PublicAddress;

/// Trait for address store implementations
///
/// The store holds exactly one address or nothing. There is no history.
///
/// # Error semantics
///
/// `read` distinguishes two outcomes that callers treat very differently:
/// - `Ok(None)`: no usable prior value (missing, empty or unparsable content)
/// - `Err(_)`: the backing resource could not be accessed at all
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Create an empty backing resource if none exists
    ///
    /// Idempotent. A failure here means the store can never be written and
    /// is treated as a fatal startup condition.
    async fn ensure_exists(&self) -> Result<(), crate::Error>;

    /// Read the last known address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(PublicAddress))`: The stored address
    /// - `Ok(None)`: Nothing usable is stored
    /// - `Err(Error)`: Storage I/O error
    async fn read(&self) -> Result<Option<PublicAddress>, crate::Error>;

    /// Replace the stored address
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The new address is durable
    /// - `Err(Error)`: Storage I/O error
    async fn write(&self, addr: PublicAddress) -> Result<(), crate::Error>;
}
