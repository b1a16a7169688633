//! Lookup target resolution
//!
//! Validates caller-supplied IP literals before any I/O and decides
//! whether a lookup is for a concrete address or for the caller itself.

use crate::error::{Error, Result};
use std::fmt;
use std::net::IpAddr;

/// Cache subject used when the backend resolves the caller's own address
pub const CURRENT_SUBJECT: &str = "current";

/// Source of the caller's observed address (e.g. the HTTP request peer)
pub trait ClientAddress: Send + Sync {
    /// The address of the client making the current request, if known
    fn client_ip(&self) -> Option<IpAddr>;
}

/// What a lookup resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTarget {
    /// A concrete address
    Address(IpAddr),
    /// The backend's "self" endpoint
    Current,
}

impl LookupTarget {
    /// Validate an optional IP literal
    ///
    /// Blank input counts as omitted.
    pub fn parse(ip: Option<&str>) -> Result<Self> {
        match ip.map(str::trim) {
            None | Some("") => Ok(LookupTarget::Current),
            Some(literal) => literal
                .parse::<IpAddr>()
                .map(LookupTarget::Address)
                .map_err(|_| Error::invalid_address(literal)),
        }
    }

    /// Validate and fill an omitted address from the client collaborator
    pub fn resolve(ip: Option<&str>, client: Option<&dyn ClientAddress>) -> Result<Self> {
        let target = Self::parse(ip)?;
        if target == LookupTarget::Current {
            if let Some(observed) = client.and_then(|c| c.client_ip()) {
                return Ok(LookupTarget::Address(observed));
            }
        }
        Ok(target)
    }

    /// The concrete address, if any
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            LookupTarget::Address(ip) => Some(*ip),
            LookupTarget::Current => None,
        }
    }

    /// The string hashed into cache keys
    pub fn cache_subject(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LookupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupTarget::Address(ip) => write!(f, "{}", ip),
            LookupTarget::Current => f.write_str(CURRENT_SUBJECT),
        }
    }
}

/// A fixed client address, handy for hosts that already know the peer
#[derive(Debug, Clone, Copy)]
pub struct StaticClientAddress(pub IpAddr);

impl ClientAddress for StaticClientAddress {
    fn client_ip(&self) -> Option<IpAddr> {
        Some(self.0)
    }
}
