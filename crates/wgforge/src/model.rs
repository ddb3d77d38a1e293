//! In-memory configuration model: one interface plus its ordered peer set.
//!
//! Mutation goes through [`ConfigModel`], which re-checks invariants before
//! any change becomes visible; a failed mutation leaves the model untouched.

use std::collections::HashSet;
use std::net::IpAddr;

use thiserror::Error;
use tracing::debug;

use crate::error::{Result, WgError};
use crate::keys::{PresharedKey, PrivateKey, PublicKey};
use crate::types::{AllowedIp, Endpoint};

/// A remote endpoint's configuration as known to this interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    /// The peer's public key, unique within the interface's peer set.
    pub public_key: PublicKey,
    /// Address ranges this peer is authorized to route traffic for.
    pub allowed_ips: Vec<AllowedIp>,
    /// The peer's reachable endpoint, if known.
    pub endpoint: Option<Endpoint>,
    /// Optional symmetric secret for this peer relation.
    pub preshared_key: Option<PresharedKey>,
    /// Persistent keepalive interval in seconds.
    pub persistent_keepalive: Option<u16>,
    /// Unrecognized keys carried through parsing, preserved opaquely.
    pub(crate) extra: Vec<(String, String)>,
}

impl Peer {
    /// Creates a new peer with the given public key.
    #[must_use]
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            allowed_ips: Vec::new(),
            endpoint: None,
            preshared_key: None,
            persistent_keepalive: None,
            extra: Vec::new(),
        }
    }

    /// Adds an allowed IP.
    #[must_use]
    pub fn with_allowed_ip(mut self, ip: AllowedIp) -> Self {
        self.allowed_ips.push(ip);
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the preshared key.
    #[must_use]
    pub fn with_preshared_key(mut self, key: PresharedKey) -> Self {
        self.preshared_key = Some(key);
        self
    }

    /// Sets the persistent keepalive interval.
    #[must_use]
    pub fn with_persistent_keepalive(mut self, seconds: u16) -> Self {
        self.persistent_keepalive = Some(seconds);
        self
    }

    /// Returns the single host addresses (full-length prefixes) among this
    /// peer's allowed IPs. These are the addresses a caller releases back
    /// to an [`crate::alloc::AddressPool`] when the peer is removed.
    #[must_use]
    pub fn host_addresses(&self) -> Vec<IpAddr> {
        self.allowed_ips
            .iter()
            .filter(|ip| {
                let net = ip.network();
                net.prefix_len() == net.max_prefix_len()
            })
            .map(AllowedIp::addr)
            .collect()
    }
}

/// The local endpoint's configuration record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    /// The interface's private key.
    pub private_key: PrivateKey,
    /// UDP port to listen on, if fixed.
    pub listen_port: Option<u16>,
    /// The address assigned to this node, in CIDR form (host + subnet).
    pub address: AllowedIp,
    /// Unrecognized keys carried through parsing, preserved opaquely.
    pub(crate) extra: Vec<(String, String)>,
}

impl Interface {
    /// Creates a new interface record.
    #[must_use]
    pub fn new(private_key: PrivateKey, address: AllowedIp) -> Self {
        Self {
            private_key,
            listen_port: None,
            address,
            extra: Vec::new(),
        }
    }

    /// Sets the listen port.
    #[must_use]
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = Some(port);
        self
    }
}

/// A single violation found by [`ConfigModel::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    /// The interface address is not a usable host within its subnet.
    #[error("interface address {address} is not a usable host in its subnet")]
    UnusableInterfaceAddress {
        /// The offending address in CIDR form.
        address: String,
    },

    /// A peer's allowed IPs cover the interface's own address.
    #[error("peer {peer} allowed IP {allowed_ip} covers the interface address")]
    InterfaceAddressCollision {
        /// The offending peer's public key.
        peer: String,
        /// The allowed IP entry that covers the interface address.
        allowed_ip: String,
    },

    /// A peer's public key is not a plausible curve point.
    #[error("peer {peer} has an invalid public key")]
    InvalidPeerKey {
        /// The offending peer's public key.
        peer: String,
    },

    /// A peer has no allowed IPs.
    #[error("peer {peer} has no allowed IPs")]
    EmptyAllowedIps {
        /// The offending peer's public key.
        peer: String,
    },

    /// Two peers share a public key.
    #[error("public key {peer} appears on more than one peer")]
    DuplicatePeerKey {
        /// The duplicated public key.
        peer: String,
    },

    /// Two peers' allowed IPs intersect.
    #[error("peer {peer} allowed IP {allowed_ip} overlaps {other_ip} of peer {other}")]
    OverlappingAllowedIps {
        /// The later peer in stored order.
        peer: String,
        /// Its conflicting allowed IP.
        allowed_ip: String,
        /// The earlier peer it conflicts with.
        other: String,
        /// The earlier peer's conflicting allowed IP.
        other_ip: String,
    },
}

/// An interface plus its peer set, with structural invariants enforced at
/// every mutation. Peer insertion order is preserved for stable
/// serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigModel {
    interface: Interface,
    peers: Vec<Peer>,
}

impl ConfigModel {
    /// Creates a model with no peers.
    #[must_use]
    pub fn new(interface: Interface) -> Self {
        Self {
            interface,
            peers: Vec::new(),
        }
    }

    /// Assembles a model from already-parsed parts without invariant checks.
    /// Used by the deserializer; callers must run [`Self::validate`] before
    /// applying such a model.
    pub(crate) fn from_parts(interface: Interface, peers: Vec<Peer>) -> Self {
        Self { interface, peers }
    }

    /// Returns the interface record.
    #[must_use]
    pub const fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Returns the peers in insertion order.
    #[must_use]
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Finds a peer by public key.
    #[must_use]
    pub fn peer(&self, public_key: &PublicKey) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.public_key == public_key)
    }

    /// Adds a peer.
    ///
    /// # Errors
    ///
    /// - [`WgError::DuplicatePeerKey`] if a peer with the same public key
    ///   exists.
    /// - [`WgError::OverlappingAllowedIps`] if any allowed IP intersects an
    ///   existing peer's allowed IPs.
    ///
    /// On error the model is unchanged; there is no partial insert.
    pub fn add_peer(&mut self, peer: Peer) -> Result<()> {
        if self.peer(&peer.public_key).is_some() {
            return Err(WgError::DuplicatePeerKey(peer.public_key.to_base64()));
        }
        for existing in &self.peers {
            for theirs in &existing.allowed_ips {
                if let Some(ours) = peer.allowed_ips.iter().find(|ip| ip.overlaps(theirs)) {
                    return Err(WgError::OverlappingAllowedIps {
                        candidate: ours.to_cidr(),
                        existing: theirs.to_cidr(),
                        peer: existing.public_key.to_base64(),
                    });
                }
            }
        }

        debug!(peer = %peer.public_key, "added peer to model");
        self.peers.push(peer);
        Ok(())
    }

    /// Removes the peer with the given public key and returns it, so the
    /// caller can release any pool address the peer held exclusively.
    ///
    /// # Errors
    ///
    /// Returns [`WgError::PeerNotFound`] if no such peer exists; the model
    /// is unchanged.
    pub fn remove_peer(&mut self, public_key: &PublicKey) -> Result<Peer> {
        let idx = self
            .peers
            .iter()
            .position(|p| &p.public_key == public_key)
            .ok_or_else(|| WgError::PeerNotFound(public_key.to_base64()))?;
        debug!(peer = %public_key, "removed peer from model");
        Ok(self.peers.remove(idx))
    }

    /// Runs the full consistency check and returns every violation found,
    /// in a stable order. An empty list means the model is valid. Nothing
    /// is fixed or mutated.
    #[must_use]
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if !interface_address_usable(&self.interface.address) {
            violations.push(Violation::UnusableInterfaceAddress {
                address: self.interface.address.to_cidr(),
            });
        }

        let interface_addr = self.interface.address.addr();
        let mut seen_keys: HashSet<[u8; 32]> = HashSet::new();

        for (idx, peer) in self.peers.iter().enumerate() {
            let key = peer.public_key.to_base64();

            if !peer.public_key.is_valid() {
                violations.push(Violation::InvalidPeerKey { peer: key.clone() });
            }
            if peer.allowed_ips.is_empty() {
                violations.push(Violation::EmptyAllowedIps { peer: key.clone() });
            }
            if !seen_keys.insert(*peer.public_key.as_bytes()) {
                violations.push(Violation::DuplicatePeerKey { peer: key.clone() });
            }

            for ip in &peer.allowed_ips {
                if ip.contains(&interface_addr) {
                    violations.push(Violation::InterfaceAddressCollision {
                        peer: key.clone(),
                        allowed_ip: ip.to_cidr(),
                    });
                }
            }

            for earlier in &self.peers[..idx] {
                for theirs in &earlier.allowed_ips {
                    for ours in &peer.allowed_ips {
                        if ours.overlaps(theirs) {
                            violations.push(Violation::OverlappingAllowedIps {
                                peer: key.clone(),
                                allowed_ip: ours.to_cidr(),
                                other: earlier.public_key.to_base64(),
                                other_ip: theirs.to_cidr(),
                            });
                        }
                    }
                }
            }
        }

        violations
    }
}

/// Whether a CIDR-form interface address denotes a usable host: inside the
/// subnet's host range, not the network or broadcast address.
fn interface_address_usable(address: &AllowedIp) -> bool {
    use ipnet::IpNet;
    let net = address.network();
    match net {
        IpNet::V4(v4) => {
            if v4.prefix_len() >= 31 {
                return true;
            }
            let host = v4.addr();
            host != v4.network() && host != v4.broadcast()
        }
        // IPv6 has no broadcast; only the subnet-router anycast address
        // (all-zero host bits) is off limits.
        IpNet::V6(v6) => v6.prefix_len() >= 127 || v6.addr() != v6.network(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_SIZE;

    fn test_private_key() -> PrivateKey {
        PrivateKey::from_bytes_clamped([1u8; KEY_SIZE])
    }

    fn test_public_key(seed: u8) -> PublicKey {
        PrivateKey::from_bytes_clamped([seed; KEY_SIZE]).public_key()
    }

    fn test_interface() -> Interface {
        let address = AllowedIp::from_cidr("10.0.0.1/24").expect("valid cidr");
        Interface::new(test_private_key(), address).with_listen_port(51820)
    }

    fn peer_with_ip(seed: u8, cidr: &str) -> Peer {
        Peer::new(test_public_key(seed))
            .with_allowed_ip(AllowedIp::from_cidr(cidr).expect("valid cidr"))
    }

    #[test]
    fn add_peer_appends_in_order() {
        let mut model = ConfigModel::new(test_interface());
        model.add_peer(peer_with_ip(2, "10.0.0.2/32")).expect("add");
        model.add_peer(peer_with_ip(3, "10.0.0.3/32")).expect("add");

        let keys: Vec<_> = model.peers().iter().map(|p| p.public_key).collect();
        assert_eq!(keys, vec![test_public_key(2), test_public_key(3)]);
    }

    #[test]
    fn add_duplicate_key_fails_without_change() {
        let mut model = ConfigModel::new(test_interface());
        model.add_peer(peer_with_ip(2, "10.0.0.2/32")).expect("add");

        let result = model.add_peer(peer_with_ip(2, "10.0.0.3/32"));
        assert!(matches!(result, Err(WgError::DuplicatePeerKey(_))));
        assert_eq!(model.peers().len(), 1);
    }

    #[test]
    fn add_overlapping_allowed_ips_fails_without_change() {
        let mut model = ConfigModel::new(test_interface());
        model.add_peer(peer_with_ip(2, "10.0.0.2/32")).expect("add");

        // 10.0.0.0/28 covers 10.0.0.2
        let result = model.add_peer(peer_with_ip(3, "10.0.0.0/28"));
        assert!(matches!(result, Err(WgError::OverlappingAllowedIps { .. })));
        assert_eq!(model.peers().len(), 1);
    }

    #[test]
    fn remove_peer_returns_it() {
        let mut model = ConfigModel::new(test_interface());
        model.add_peer(peer_with_ip(2, "10.0.0.2/32")).expect("add");

        let removed = model.remove_peer(&test_public_key(2)).expect("remove");
        assert_eq!(removed.public_key, test_public_key(2));
        assert!(model.peers().is_empty());
    }

    #[test]
    fn remove_missing_peer_fails_without_change() {
        let mut model = ConfigModel::new(test_interface());
        model.add_peer(peer_with_ip(2, "10.0.0.2/32")).expect("add");

        let result = model.remove_peer(&test_public_key(9));
        assert!(matches!(result, Err(WgError::PeerNotFound(_))));
        assert_eq!(model.peers().len(), 1);
    }

    #[test]
    fn host_addresses_picks_full_length_prefixes() {
        let peer = Peer::new(test_public_key(2))
            .with_allowed_ip(AllowedIp::from_cidr("10.0.0.2/32").expect("valid cidr"))
            .with_allowed_ip(AllowedIp::from_cidr("192.168.0.0/24").expect("valid cidr"));

        let hosts = peer.host_addresses();
        assert_eq!(hosts, vec!["10.0.0.2".parse::<IpAddr>().expect("valid ip")]);
    }

    #[test]
    fn valid_model_has_no_violations() {
        let mut model = ConfigModel::new(test_interface());
        model.add_peer(peer_with_ip(2, "10.0.0.2/32")).expect("add");
        assert!(model.validate().is_empty());
    }

    #[test]
    fn validate_flags_unusable_interface_address() {
        let address = AllowedIp::from_cidr("10.0.0.0/24").expect("valid cidr");
        let model = ConfigModel::new(Interface::new(test_private_key(), address));

        let violations = model.validate();
        assert!(matches!(
            violations.as_slice(),
            [Violation::UnusableInterfaceAddress { .. }]
        ));
    }

    #[test]
    fn validate_flags_interface_address_collision() {
        let mut model = ConfigModel::new(test_interface());
        // Covers the interface's own 10.0.0.1
        model.add_peer(peer_with_ip(2, "10.0.0.0/28")).expect("add");

        let violations = model.validate();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::InterfaceAddressCollision { .. })));
    }

    #[test]
    fn validate_flags_invalid_public_key() {
        let zero = PublicKey::from_bytes_array([0u8; KEY_SIZE]);
        let peer = Peer::new(zero)
            .with_allowed_ip(AllowedIp::from_cidr("10.0.0.2/32").expect("valid cidr"));
        let model = ConfigModel::from_parts(test_interface(), vec![peer]);

        let violations = model.validate();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::InvalidPeerKey { .. })));
    }

    #[test]
    fn validate_collects_all_violations_in_one_pass() {
        // Built via from_parts to bypass add_peer's checks, as a parsed
        // file would be.
        let zero = PublicKey::from_bytes_array([0u8; KEY_SIZE]);
        let bad_key = Peer::new(zero)
            .with_allowed_ip(AllowedIp::from_cidr("10.0.0.2/32").expect("valid cidr"));
        let no_ips = Peer::new(test_public_key(3));
        let overlapping = Peer::new(test_public_key(4))
            .with_allowed_ip(AllowedIp::from_cidr("10.0.0.2/32").expect("valid cidr"));
        let model =
            ConfigModel::from_parts(test_interface(), vec![bad_key, no_ips, overlapping]);

        let violations = model.validate();
        assert!(violations.len() >= 3);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::InvalidPeerKey { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::EmptyAllowedIps { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::OverlappingAllowedIps { .. })));
    }

    #[test]
    fn validate_flags_duplicate_peers_from_parsed_input() {
        let a = peer_with_ip(2, "10.0.0.2/32");
        let mut b = peer_with_ip(2, "10.0.0.3/32");
        b.public_key = a.public_key;
        let model = ConfigModel::from_parts(test_interface(), vec![a, b]);

        let violations = model.validate();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DuplicatePeerKey { .. })));
    }
}
