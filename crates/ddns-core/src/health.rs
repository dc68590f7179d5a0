//! TCP liveness listener
//!
//! External health checks only need to see a TCP connect succeed. Every
//! accepted connection is closed immediately; nothing is read or written.
//!
//! An accept error means the listening socket is broken and the health
//! contract with the outside world is void, so [`HealthListener::run`]
//! returns the error instead of retrying. The daemon treats that as fatal.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Bound health-check listener
#[derive(Debug)]
pub struct HealthListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HealthListener {
    /// Bind the listener
    ///
    /// Binding port 0 picks a free port; see [`HealthListener::local_addr`].
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::listener(format!("Failed to listen on {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::listener(format!("Failed to read bound address: {}", e)))?;

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and close connections until `cancel` fires
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Cancelled
    /// - `Err(Error)`: Accepting failed
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(addr = %self.local_addr, "Listening for health checks");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_health_check(stream, peer));
                }
                Err(e) => {
                    return Err(Error::listener(format!("Failed to accept connection: {}", e)));
                }
            }
        }

        debug!(addr = %self.local_addr, "Health listener stopped");
        Ok(())
    }
}

async fn handle_health_check(stream: TcpStream, peer: SocketAddr) {
    debug!(peer = %peer, "Health check");
    drop(stream);
}
