//! Public address monitor loop
//!
//! The MonitorLoop is responsible for:
//! - Resolving the current public address via IpSource on a fixed interval
//! - Comparing it with the last known address in AddressStore
//! - Updating the DNS record via DnsProvider when they differ
//! - Persisting the new address
//!
//! ## Architecture
//!
//! ```text
//!   interval tick
//!        │
//!        ▼
//! ┌──────────────┐  current()   ┌─────────────┐
//! │ MonitorLoop  │─────────────▶│  IpSource   │
//! └──────────────┘              └─────────────┘
//!        │ read()               ┌──────────────┐
//!        ├─────────────────────▶│ AddressStore │
//!        │ update_record()      └──────────────┘
//!        ├─────────────────────▶┌─────────────┐
//!        │                      │ DnsProvider │
//!        │ write()              └─────────────┘
//!        └─────────────────────▶ AddressStore
//! ```
//!
//! ## Tick States
//!
//! `Idle → Resolving → Comparing → (Unchanged | Updating → Persisting) → Idle`
//!
//! ## Error Policy
//!
//! | Stage | On error |
//! |-------|----------|
//! | Resolving | log, skip the rest of the tick, store untouched |
//! | Comparing (store read) | stop the loop and return the error |
//! | Updating | log, persist according to [`PersistPolicy`] |
//! | Persisting | log, carry on |

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{DdnsConfig, PersistPolicy};
use crate::error::{Error, Result};
use crate::traits::{AddressStore, DnsProvider, IpSource, UpdateResult};
use crate::PublicAddress;

/// Default capacity of the monitor event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Monitor loop settings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between tick starts
    pub interval: Duration,

    /// Address store policy after a failed update
    pub persist_policy: PersistPolicy,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped with a warning.
    pub event_channel_capacity: usize,
}

impl MonitorConfig {
    /// Create settings with the given interval and defaults otherwise
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            persist_policy: PersistPolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Set the persist policy
    pub fn with_persist_policy(mut self, persist_policy: PersistPolicy) -> Self {
        self.persist_policy = persist_policy;
        self
    }
}

impl From<&DdnsConfig> for MonitorConfig {
    fn from(config: &DdnsConfig) -> Self {
        Self::new(config.interval).with_persist_policy(config.persist_policy)
    }
}

/// Events emitted by the MonitorLoop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Loop started
    Started {
        interval: Duration,
    },

    /// Public address could not be resolved this tick
    ResolveFailed {
        error: String,
    },

    /// Resolved address matches the stored one
    Unchanged {
        current_ip: PublicAddress,
    },

    /// DNS update succeeded
    UpdateSucceeded {
        new_ip: PublicAddress,
        previous_ip: Option<PublicAddress>,
    },

    /// DNS update failed
    UpdateFailed {
        new_ip: PublicAddress,
        error: String,
    },

    /// New address written to the store
    Persisted {
        ip: PublicAddress,
    },

    /// New address could not be written to the store
    PersistFailed {
        ip: PublicAddress,
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Resolution failed; nothing else happened
    ResolveFailed,

    /// Stored address already matches
    Unchanged(PublicAddress),

    /// Provider confirmed the new address
    Updated {
        new_ip: PublicAddress,
        persisted: bool,
    },

    /// Provider call failed
    UpdateFailed {
        new_ip: PublicAddress,
        persisted: bool,
    },
}

/// Polling monitor for the public address
///
/// Holds no state between ticks beyond what it re-reads from the
/// `AddressStore`, so a restart resumes purely from the stored address.
///
/// ## Lifecycle
///
/// 1. Create with [`MonitorLoop::new()`]
/// 2. Start with [`MonitorLoop::run()`], passing a `CancellationToken`
/// 3. Cancel the token to stop; `run()` returns `Ok(())`
///
/// ## Timing
///
/// Ticks start at `start + n * interval` on the monotonic clock. The first
/// tick runs immediately. A tick that overruns the interval is followed by
/// a single late tick, after which the schedule realigns to the next
/// boundary; missed boundaries are never fired in a burst.
pub struct MonitorLoop {
    /// Public address resolver
    ip_source: Box<dyn IpSource>,

    /// DNS provider for updating the record
    provider: Box<dyn DnsProvider>,

    /// Last known address
    store: Box<dyn AddressStore>,

    /// Time between tick starts
    interval: Duration,

    /// Address store policy after a failed update
    persist_policy: PersistPolicy,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl MonitorLoop {
    /// Create a new monitor loop
    ///
    /// # Returns
    ///
    /// A tuple of (monitor, event_receiver) where event_receiver yields monitor events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        store: Box<dyn AddressStore>,
        config: MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        if config.interval.is_zero() {
            return Err(Error::config("Monitor interval must be > 0"));
        }
        if config.event_channel_capacity == 0 {
            return Err(Error::config("Monitor event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let monitor = Self {
            ip_source,
            provider,
            store,
            interval: config.interval,
            persist_policy: config.persist_policy,
            event_tx: tx,
        };

        Ok((monitor, rx))
    }

    /// Run the monitor until `cancel` fires
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Cancelled
    /// - `Err(Error)`: The address store could not be read; monitoring stopped
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(interval = ?self.interval, "Starting DNS check loop");
        self.emit_event(MonitorEvent::Started {
            interval: self.interval,
        });

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            if let Err(e) = outcome {
                error!(stage = "compare", error = %e, "Stopping monitor: last known IP cannot be read");
                self.emit_event(MonitorEvent::Stopped {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        }

        info!("Shutdown signal received, monitor stopped");
        self.emit_event(MonitorEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        Ok(())
    }

    /// Run one resolve → compare → update → persist pass
    ///
    /// # Returns
    ///
    /// - `Ok(TickOutcome)`: What the tick did; resolver, provider and store
    ///   write failures are reported here, not as errors
    /// - `Err(Error)`: The address store could not be read
    pub async fn tick(&self) -> Result<TickOutcome> {
        // Resolving
        let new_ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                error!(
                    stage = "resolve",
                    source = self.ip_source.source_name(),
                    error = %e,
                    "Unable to get public IP"
                );
                self.emit_event(MonitorEvent::ResolveFailed {
                    error: e.to_string(),
                });
                return Ok(TickOutcome::ResolveFailed);
            }
        };
        debug!(ip = %new_ip, "Current public IP");

        // Comparing
        let previous_ip = self.store.read().await?;
        debug!(previous = ?previous_ip.map(|ip| ip.to_string()), "Previous IP");

        if previous_ip == Some(new_ip) {
            debug!(ip = %new_ip, "No update required");
            self.emit_event(MonitorEvent::Unchanged { current_ip: new_ip });
            return Ok(TickOutcome::Unchanged(new_ip));
        }

        // Updating
        let updated = self.update(new_ip, previous_ip).await;

        // Persisting
        let persisted = if updated || self.persist_policy == PersistPolicy::Always {
            self.persist(new_ip).await
        } else {
            warn!(
                ip = %new_ip,
                "Leaving last known IP unchanged so the update is retried next tick"
            );
            false
        };

        Ok(if updated {
            TickOutcome::Updated { new_ip, persisted }
        } else {
            TickOutcome::UpdateFailed { new_ip, persisted }
        })
    }

    /// Push `new_ip` to the provider, returning whether it was accepted
    async fn update(&self, new_ip: PublicAddress, previous_ip: Option<PublicAddress>) -> bool {
        debug!(ip = %new_ip, provider = self.provider.provider_name(), "Updating DNS");

        match self.provider.update_record(new_ip).await {
            Ok(result) => {
                match result {
                    UpdateResult::Updated { .. } => {
                        info!(
                            ip = %new_ip,
                            previous = ?previous_ip.map(|ip| ip.to_string()),
                            "DNS updated"
                        );
                    }
                    UpdateResult::Unchanged { .. } => {
                        info!(ip = %new_ip, "DNS record already up to date");
                    }
                }
                self.emit_event(MonitorEvent::UpdateSucceeded {
                    new_ip: result.address(),
                    previous_ip,
                });
                true
            }
            Err(e) => {
                error!(
                    stage = "update",
                    provider = self.provider.provider_name(),
                    ip = %new_ip,
                    error = %e,
                    "Unable to update DNS via API"
                );
                self.emit_event(MonitorEvent::UpdateFailed {
                    new_ip,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Write `ip` to the store, returning whether it was written
    async fn persist(&self, ip: PublicAddress) -> bool {
        match self.store.write(ip).await {
            Ok(()) => {
                debug!(ip = %ip, "Persisted public IP");
                self.emit_event(MonitorEvent::Persisted { ip });
                true
            }
            Err(e) => {
                error!(stage = "persist", ip = %ip, error = %e, "Unable to persist public IP");
                self.emit_event(MonitorEvent::PersistFailed {
                    ip,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Emit a monitor event
    fn emit_event(&self, event: MonitorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
