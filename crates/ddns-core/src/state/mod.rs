// # Address Store Implementations
//
// This module provides implementations of the AddressStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileAddressStore;
pub use memory::MemoryAddressStore;
