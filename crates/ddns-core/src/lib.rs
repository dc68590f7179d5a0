// # ddns-core
//
// Core library for the polling dynamic-DNS update agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping one DNS record
// pointed at the caller's public IPv4 address:
// - **IpSource**: Trait for resolving the current public address
// - **DnsProvider**: Trait for pushing an address to a DNS provider API
// - **AddressStore**: Trait for the durable "last known address" cell
// - **MonitorLoop**: Orchestrates resolve → compare → update → persist on a timer
// - **HealthListener**: Bare TCP acceptor used by liveness probes
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The loop only talks to the traits
// 2. **Explicit Configuration**: `DdnsConfig` is built once and passed in, never global
// 3. **Deterministic Shutdown**: Long-running tasks observe a `CancellationToken`
// 4. **Crash Resumable**: The loop holds no state between ticks beyond the store

pub mod address;
pub mod config;
pub mod error;
pub mod health;
pub mod monitor;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use address::PublicAddress;
pub use config::{DdnsConfig, PersistPolicy};
pub use error::{Error, Result};
pub use health::HealthListener;
pub use monitor::{MonitorConfig, MonitorEvent, MonitorLoop, TickOutcome};
pub use state::{FileAddressStore, MemoryAddressStore};
pub use traits::{AddressStore, DnsProvider, IpSource, UpdateResult};
