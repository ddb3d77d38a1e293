//! Network value types shared across the configuration model.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WgError};

/// An address range in CIDR notation, as used by `Address` and `AllowedIPs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowedIp {
    network: IpNet,
}

impl AllowedIp {
    /// Creates a new allowed IP from an `IpNet`.
    #[must_use]
    pub const fn new(network: IpNet) -> Self {
        Self { network }
    }

    /// Creates an allowed IP from CIDR notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the CIDR notation is invalid.
    pub fn from_cidr(s: &str) -> Result<Self> {
        let network = s
            .parse::<IpNet>()
            .map_err(|e| WgError::InvalidCidr(format!("{s}: {e}")))?;
        Ok(Self { network })
    }

    /// Returns the network.
    #[must_use]
    pub const fn network(&self) -> &IpNet {
        &self.network
    }

    /// Returns the network as IPv4, if it is one.
    #[must_use]
    pub const fn as_ipv4(&self) -> Option<Ipv4Net> {
        match self.network {
            IpNet::V4(net) => Some(net),
            IpNet::V6(_) => None,
        }
    }

    /// Returns the address part of the CIDR (host bits intact).
    #[must_use]
    pub fn addr(&self) -> IpAddr {
        self.network.addr()
    }

    /// Returns the CIDR string representation.
    #[must_use]
    pub fn to_cidr(&self) -> String {
        self.network.to_string()
    }

    /// Returns whether this range and `other` share any address.
    ///
    /// CIDR ranges are aligned, so two ranges intersect exactly when one
    /// contains the other's network address.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let this = self.network.trunc();
        let that = other.network.trunc();
        this.contains(&that.network()) || that.contains(&this.network())
    }

    /// Returns whether this range covers `addr`.
    #[must_use]
    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.network.trunc().contains(addr)
    }
}

impl FromStr for AllowedIp {
    type Err = WgError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_cidr(s)
    }
}

impl fmt::Display for AllowedIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

/// A peer endpoint: host and port, where the host may be an IP literal or a
/// DNS name. No resolution is performed at parse time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates a new endpoint from host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the host part.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Endpoint {
    type Err = WgError;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| WgError::InvalidEndpoint(format!("{s}: missing port")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| WgError::InvalidEndpoint(format!("{s}: invalid port")))?;

        // Bracketed IPv6 literal: [::1]:51820
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(WgError::InvalidEndpoint(format!("{s}: empty host")));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
