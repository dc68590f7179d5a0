// # File Address Store
//
// File-based implementation of AddressStore.
//
// ## Purpose
//
// Persists the last known public address across restarts so the monitor
// does not push a redundant update every time the daemon starts.
//
// ## File Format
//
// The entire file content is the dotted-decimal text of the address, with
// no trailing newline:
//
// ```text
// 203.0.113.5
// ```
//
// An empty file (as created by `ensure_exists`) means "no prior address".
//
// ## Crash Safety
//
// - Atomic writes: new content goes to a sibling temp file, then is renamed
// - A crash mid-write leaves either the old or the new address, never a mix

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::PublicAddress;
use crate::traits::AddressStore;

/// File-based address store
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::FileAddressStore;
/// use ddns_core::traits::AddressStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileAddressStore::new("/var/lib/ddns/last_ip");
///     store.ensure_exists().await?;
///
///     store.write("1.2.3.4".parse()?).await?;
///     assert_eq!(store.read().await?, Some("1.2.3.4".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileAddressStore {
    path: PathBuf,
}

impl FileAddressStore {
    /// Create a store backed by `path`
    ///
    /// Nothing is touched on disk until a trait method is called.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write `addr` to `temp_path`, fsync it, then rename it over the store
    async fn replace_via(&self, temp_path: &Path, addr: PublicAddress) -> Result<(), Error> {
        {
            let mut file = fs::File::create(temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(addr.to_string().as_bytes())
                .await
                .map_err(|e| {
                    Error::state_store(format!(
                        "Failed to write to temp file {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl AddressStore for FileAddressStore {
    async fn ensure_exists(&self) -> Result<(), Error> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !fs::try_exists(parent).await.unwrap_or(false)
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // create(true) without truncate keeps an existing address intact
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::state_store(format!(
                    "Failed to create address file {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        tracing::debug!(path = %self.path.display(), "Address file ready");
        Ok(())
    }

    async fn read(&self) -> Result<Option<PublicAddress>, Error> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Address file does not exist");
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read address file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        match PublicAddress::parse(&text) {
            Ok(addr) => Ok(Some(addr)),
            Err(_) => {
                if !text.trim().is_empty() {
                    tracing::warn!(
                        path = %self.path.display(),
                        content = %text.trim(),
                        "Address file does not hold a valid IPv4 address; treating as absent"
                    );
                }
                Ok(None)
            }
        }
    }

    async fn write(&self, addr: PublicAddress) -> Result<(), Error> {
        let temp_path = self.temp_path();

        if let Err(e) = self.replace_via(&temp_path, addr).await {
            // Never leave a partial temp file next to the store
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "Failed to remove temp file"
                );
            }
            return Err(e);
        }

        tracing::trace!(path = %self.path.display(), ip = %addr, "Address written");
        Ok(())
    }
}
