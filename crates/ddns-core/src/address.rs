//! The public IPv4 address value
//!
//! `PublicAddress` is the unit that is resolved, compared, persisted and
//! transmitted. It has no identity beyond its four octets.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::Error;

/// A public IPv4 address
///
/// Two addresses are equal iff their octets are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicAddress(Ipv4Addr);

impl PublicAddress {
    /// Wrap an IPv4 address
    pub const fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    /// Parse a dotted-decimal IPv4 literal
    ///
    /// Surrounding whitespace (e.g. a trailing newline from a plain-text
    /// HTTP body) is ignored. IPv6 literals are rejected.
    pub fn parse(text: &str) -> Result<Self, Error> {
        text.trim()
            .parse::<Ipv4Addr>()
            .map(Self)
            .map_err(|_| Error::invalid_address(text))
    }

    /// The four octets of the address
    pub const fn octets(&self) -> [u8; 4] {
        self.0.octets()
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PublicAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Ipv4Addr> for PublicAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl From<[u8; 4]> for PublicAddress {
    fn from(octets: [u8; 4]) -> Self {
        Self(Ipv4Addr::from(octets))
    }
}

impl From<PublicAddress> for Ipv4Addr {
    fn from(addr: PublicAddress) -> Self {
        addr.0
    }
}
