//! Core traits for the DDNS agent
//!
//! This module defines the seams the monitor loop is written against.
//!
//! - [`IpSource`]: Resolve the current public address
//! - [`DnsProvider`]: Push an address to a DNS provider
//! - [`AddressStore`]: Durable last-known-address cell

pub mod address_store;
pub mod dns_provider;
pub mod ip_source;

pub use address_store::AddressStore;
pub use dns_provider::{DnsProvider, UpdateResult};
pub use ip_source::IpSource;
