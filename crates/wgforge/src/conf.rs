//! The canonical on-disk configuration format.
//!
//! Line-oriented UTF-8 text: an `[Interface]` section followed by one
//! `[Peer]` section per peer, `Key = Value` pairs, `#`/`;` comment lines.
//! Serialization field order is a hard contract: identical model state
//! produces byte-identical output, so reapplying is diffable and
//! idempotent. Unknown keys inside recognized sections survive a parse
//! round-trip; comments do not.

use std::fmt::Write as _;

use crate::error::{Result, WgError};
use crate::keys::{PresharedKey, PrivateKey, PublicKey};
use crate::model::{ConfigModel, Interface, Peer};
use crate::types::{AllowedIp, Endpoint};

/// Renders a model to canonical configuration text.
///
/// Field order: `[Interface]` PrivateKey, Address, ListenPort (if set),
/// then unknown keys in stored order; each `[Peer]` in model order with
/// PublicKey, AllowedIPs, Endpoint, PresharedKey, PersistentKeepalive
/// (optional fields only if set), then unknown keys.
#[must_use]
pub fn to_conf(model: &ConfigModel) -> String {
    let mut out = String::new();
    let interface = model.interface();

    out.push_str("[Interface]\n");
    let _ = writeln!(out, "PrivateKey = {}", interface.private_key.to_base64());
    let _ = writeln!(out, "Address = {}", interface.address.to_cidr());
    if let Some(port) = interface.listen_port {
        let _ = writeln!(out, "ListenPort = {port}");
    }
    for (key, value) in &interface.extra {
        let _ = writeln!(out, "{key} = {value}");
    }

    for peer in model.peers() {
        out.push('\n');
        out.push_str("[Peer]\n");
        let _ = writeln!(out, "PublicKey = {}", peer.public_key.to_base64());
        if !peer.allowed_ips.is_empty() {
            let ips: Vec<String> = peer.allowed_ips.iter().map(AllowedIp::to_cidr).collect();
            let _ = writeln!(out, "AllowedIPs = {}", ips.join(", "));
        }
        if let Some(endpoint) = &peer.endpoint {
            let _ = writeln!(out, "Endpoint = {endpoint}");
        }
        if let Some(psk) = &peer.preshared_key {
            let _ = writeln!(out, "PresharedKey = {}", psk.to_base64());
        }
        if let Some(keepalive) = peer.persistent_keepalive {
            let _ = writeln!(out, "PersistentKeepalive = {keepalive}");
        }
        for (key, value) in &peer.extra {
            let _ = writeln!(out, "{key} = {value}");
        }
    }

    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Interface,
    Peer,
}

#[derive(Default)]
struct ParsedInterface {
    private_key: Option<PrivateKey>,
    listen_port: Option<u16>,
    address: Option<AllowedIp>,
    extra: Vec<(String, String)>,
}

impl ParsedInterface {
    fn field(&mut self, key: &str, value: &str, line: usize) -> Result<()> {
        match key {
            "PrivateKey" => {
                // The value is secret; error messages never echo it.
                self.private_key =
                    Some(PrivateKey::from_base64(value).map_err(|_| WgError::MalformedField {
                        line,
                        message: "invalid PrivateKey".to_string(),
                    })?);
            }
            "Address" => {
                self.address =
                    Some(AllowedIp::from_cidr(value).map_err(|_| WgError::MalformedField {
                        line,
                        message: format!("invalid Address: {value}"),
                    })?);
            }
            "ListenPort" => {
                self.listen_port = Some(value.parse().map_err(|_| WgError::MalformedField {
                    line,
                    message: format!("invalid ListenPort: {value}"),
                })?);
            }
            _ => self.extra.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn build(self, line: usize) -> Result<Interface> {
        let private_key = self.private_key.ok_or_else(|| WgError::MalformedField {
            line,
            message: "missing PrivateKey in [Interface] section".to_string(),
        })?;
        let address = self.address.ok_or_else(|| WgError::MalformedField {
            line,
            message: "missing Address in [Interface] section".to_string(),
        })?;
        Ok(Interface {
            private_key,
            listen_port: self.listen_port,
            address,
            extra: self.extra,
        })
    }
}

#[derive(Default)]
struct ParsedPeer {
    public_key: Option<PublicKey>,
    allowed_ips: Vec<AllowedIp>,
    endpoint: Option<Endpoint>,
    preshared_key: Option<PresharedKey>,
    persistent_keepalive: Option<u16>,
    extra: Vec<(String, String)>,
}

impl ParsedPeer {
    fn field(&mut self, key: &str, value: &str, line: usize) -> Result<()> {
        match key {
            "PublicKey" => {
                self.public_key =
                    Some(PublicKey::from_base64(value).map_err(|_| WgError::MalformedField {
                        line,
                        message: format!("invalid PublicKey: {value}"),
                    })?);
            }
            "AllowedIPs" => {
                for part in value.split(',') {
                    let part = part.trim();
                    self.allowed_ips.push(AllowedIp::from_cidr(part).map_err(|_| {
                        WgError::MalformedField {
                            line,
                            message: format!("invalid AllowedIPs entry: {part}"),
                        }
                    })?);
                }
            }
            "Endpoint" => {
                self.endpoint = Some(value.parse().map_err(|_| WgError::MalformedField {
                    line,
                    message: format!("invalid Endpoint: {value}"),
                })?);
            }
            "PresharedKey" => {
                self.preshared_key =
                    Some(PresharedKey::from_base64(value).map_err(|_| WgError::MalformedField {
                        line,
                        message: "invalid PresharedKey".to_string(),
                    })?);
            }
            "PersistentKeepalive" => {
                self.persistent_keepalive =
                    Some(value.parse().map_err(|_| WgError::MalformedField {
                        line,
                        message: format!("invalid PersistentKeepalive: {value}"),
                    })?);
            }
            _ => self.extra.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn build(self, line: usize) -> Result<Peer> {
        let public_key = self.public_key.ok_or_else(|| WgError::MalformedField {
            line,
            message: "missing PublicKey in [Peer] section".to_string(),
        })?;
        Ok(Peer {
            public_key,
            allowed_ips: self.allowed_ips,
            endpoint: self.endpoint,
            preshared_key: self.preshared_key,
            persistent_keepalive: self.persistent_keepalive,
            extra: self.extra,
        })
    }
}

/// Parses configuration text into a model.
///
/// Structural invariants (overlaps, key validity) are not enforced here;
/// run [`ConfigModel::validate`] before applying a parsed model.
///
/// # Errors
///
/// - [`WgError::MalformedSection`] on an unrecognized section header.
/// - [`WgError::DuplicateInterfaceSection`] if `[Interface]` repeats.
/// - [`WgError::MalformedField`] on an unparseable line or a missing
///   required key.
pub fn from_conf(text: &str) -> Result<ConfigModel> {
    let mut section = Section::None;
    let mut current_interface: Option<ParsedInterface> = None;
    let mut current_peer: Option<ParsedPeer> = None;
    let mut peers: Vec<Peer> = Vec::new();
    let mut built_interface: Option<Interface> = None;
    let mut last_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        last_line = line;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if let Some(peer) = current_peer.take() {
                peers.push(peer.build(line)?);
            }
            if let Some(parsed) = current_interface.take() {
                built_interface = Some(parsed.build(line)?);
            }

            let name = &trimmed[1..trimmed.len() - 1];
            section = match name {
                "Interface" => {
                    if built_interface.is_some() {
                        return Err(WgError::DuplicateInterfaceSection(line));
                    }
                    current_interface = Some(ParsedInterface::default());
                    Section::Interface
                }
                "Peer" => {
                    current_peer = Some(ParsedPeer::default());
                    Section::Peer
                }
                _ => {
                    return Err(WgError::MalformedSection {
                        line,
                        name: name.to_string(),
                    });
                }
            };
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(WgError::MalformedField {
                line,
                message: format!("expected 'Key = Value', got: {trimmed}"),
            });
        };
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::None => {
                return Err(WgError::MalformedField {
                    line,
                    message: "key-value pair outside of any section".to_string(),
                });
            }
            Section::Interface => {
                if let Some(parsed) = current_interface.as_mut() {
                    parsed.field(key, value, line)?;
                }
            }
            Section::Peer => {
                if let Some(parsed) = current_peer.as_mut() {
                    parsed.field(key, value, line)?;
                }
            }
        }
    }

    if let Some(peer) = current_peer.take() {
        peers.push(peer.build(last_line)?);
    }
    if let Some(parsed) = current_interface.take() {
        built_interface = Some(parsed.build(last_line)?);
    }

    let interface = built_interface.ok_or_else(|| WgError::MalformedField {
        line: 0,
        message: "missing [Interface] section".to_string(),
    })?;

    Ok(ConfigModel::from_parts(interface, peers))
}
