// # Memory Address Store
//
// In-memory implementation of AddressStore.
//
// ## Purpose
//
// Provides a store that doesn't persist across restarts. Useful for tests
// and for embedding the monitor where the first tick after a restart is
// allowed to push an update unconditionally.
//
// ## Crash Behavior
//
// - The stored address is lost on restart
// - The first successful tick after a restart always updates DNS
//
// ## Fault Injection
//
// Reads and writes can be made to fail on demand so callers can exercise
// the monitor's error policy without touching the filesystem.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::PublicAddress;
use crate::traits::AddressStore;

/// In-memory address store implementation
///
/// Clones share the same cell, so a test can keep a handle while the
/// monitor owns another.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::MemoryAddressStore;
/// use ddns_core::traits::AddressStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryAddressStore::new();
///
///     store.write("1.2.3.4".parse()?).await?;
///     assert_eq!(store.read().await?, Some("1.2.3.4".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryAddressStore {
    inner: Arc<RwLock<Option<PublicAddress>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    write_count: Arc<AtomicUsize>,
}

impl MemoryAddressStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `addr`
    pub fn with_address(addr: PublicAddress) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(addr))),
            ..Self::default()
        }
    }

    /// Current contents, bypassing fault injection
    pub async fn snapshot(&self) -> Option<PublicAddress> {
        *self.inner.read().await
    }

    /// Make subsequent `read` calls fail with an I/O error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `write` calls fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn ensure_exists(&self) -> Result<(), Error> {
        // Nothing to create
        Ok(())
    }

    async fn read(&self) -> Result<Option<PublicAddress>, Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::state_store("injected read failure"));
        }
        Ok(*self.inner.read().await)
    }

    async fn write(&self, addr: PublicAddress) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::state_store("injected write failure"));
        }
        *self.inner.write().await = Some(addr);
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
