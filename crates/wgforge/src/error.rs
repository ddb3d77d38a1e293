//! Error types for configuration management operations.

use std::net::Ipv4Addr;
use std::time::Duration;

use ipnet::Ipv4Net;
use thiserror::Error;

use crate::model::Violation;

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, WgError>;

/// Errors that can occur while managing `WireGuard` configuration.
#[derive(Debug, Error)]
pub enum WgError {
    /// The OS entropy source could not produce random bytes.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// A key was the wrong length or otherwise malformed.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// A CIDR string could not be parsed.
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// An endpoint string could not be parsed as host:port.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A requested address is already held by another peer.
    #[error("address {0} is already allocated")]
    AddressConflict(Ipv4Addr),

    /// A requested address lies outside the pool's subnet.
    #[error("address {addr} is outside subnet {subnet}")]
    AddressOutOfRange {
        /// The rejected address.
        addr: Ipv4Addr,
        /// The pool's subnet.
        subnet: Ipv4Net,
    },

    /// Every usable address in the subnet is allocated.
    #[error("no free addresses remain in subnet {0}")]
    PoolExhausted(Ipv4Net),

    /// A peer with the same public key already exists on the interface.
    #[error("peer {0} already exists on this interface")]
    DuplicatePeerKey(String),

    /// A peer's allowed IPs intersect another peer's allowed IPs.
    #[error("allowed IP {candidate} overlaps {existing} held by peer {peer}")]
    OverlappingAllowedIps {
        /// The allowed IP being added.
        candidate: String,
        /// The conflicting allowed IP already present.
        existing: String,
        /// Public key of the peer holding the conflicting entry.
        peer: String,
    },

    /// No peer with the given public key exists on the interface.
    #[error("peer {0} not found on this interface")]
    PeerNotFound(String),

    /// An unrecognized section header was encountered while parsing.
    #[error("line {line}: unknown section [{name}]")]
    MalformedSection {
        /// 1-based line number of the header.
        line: usize,
        /// The unrecognized section name.
        name: String,
    },

    /// A key/value line could not be parsed.
    #[error("line {line}: {message}")]
    MalformedField {
        /// 1-based line number of the field, 0 when the error spans the file.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// More than one `[Interface]` section appeared in a config file.
    #[error("line {0}: duplicate [Interface] section")]
    DuplicateInterfaceSection(usize),

    /// A model failed validation; the full violation list is attached.
    #[error("validation failed with {} violation(s)", .0.len())]
    ValidationFailed(Vec<Violation>),

    /// An apply transition failed and the prior state was restored.
    #[error("apply failed: {0}")]
    ApplyFailed(String),

    /// A state transition exceeded its time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Persistence of staged or active configuration failed.
    #[error("config store i/o: {0}")]
    Io(#[from] std::io::Error),
}
