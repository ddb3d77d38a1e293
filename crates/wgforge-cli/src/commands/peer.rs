//! Peer addition and removal.

use std::io::Write;
use std::net::IpAddr;

use tracing::info;
use wgforge::{
    AddressPool, AllowedIp, ConfigModel, Endpoint, FileStore, Peer, PresharedKey, PublicKey,
};

use crate::cli::AddPeerArgs;
use crate::error::CliError;
use crate::output::{AddPeerOutput, OutputFormat, RemovePeerOutput};

use super::{load_model, save_staged};

/// Handler for `add-peer`.
pub struct AddPeerCommand {
    store: FileStore,
}

impl AddPeerCommand {
    /// Creates a new add-peer command handler.
    #[must_use]
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Adds a peer, allocating a tunnel address from the interface subnet.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration exists, the arguments are
    /// invalid, the address cannot be allocated, or the peer conflicts
    /// with an existing one.
    pub async fn execute<W: Write>(
        mut self,
        out: &mut W,
        format: &OutputFormat,
        args: &AddPeerArgs,
    ) -> Result<(), CliError> {
        let mut model = load_model(&self.store)?;
        let public_key = PublicKey::from_base64(&args.public_key)?;

        let allowed = match &args.allowed_ips {
            Some(list) => list
                .split(',')
                .map(|part| AllowedIp::from_cidr(part.trim()))
                .collect::<wgforge::Result<Vec<_>>>()?,
            None => {
                let mut pool = pool_for(&model)?;
                let address = pool.allocate(args.address)?;
                vec![AllowedIp::from_cidr(&format!("{address}/32"))?]
            }
        };
        let first = allowed[0].to_cidr();

        let mut peer = Peer::new(public_key);
        for ip in allowed {
            peer = peer.with_allowed_ip(ip);
        }
        if let Some(endpoint) = &args.endpoint {
            peer = peer.with_endpoint(endpoint.parse::<Endpoint>()?);
        }
        if let Some(seconds) = args.keepalive {
            peer = peer.with_persistent_keepalive(seconds);
        }
        let mut generated_psk = None;
        if let Some(b64) = &args.psk {
            peer = peer.with_preshared_key(PresharedKey::from_base64(b64)?);
        } else if args.gen_psk {
            let psk = PresharedKey::generate()?;
            generated_psk = Some(psk.to_base64());
            peer = peer.with_preshared_key(psk);
        }

        model.add_peer(peer)?;
        save_staged(&mut self.store, &model)?;
        info!(peer = %public_key, address = %first, "staged peer addition");

        format.write(
            out,
            &AddPeerOutput {
                public_key: public_key.to_base64(),
                address: first,
                preshared_key: generated_psk,
            },
        )
    }
}

/// Handler for `remove-peer`.
pub struct RemovePeerCommand {
    store: FileStore,
}

impl RemovePeerCommand {
    /// Creates a new remove-peer command handler.
    #[must_use]
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Removes a peer; its tunnel addresses become allocatable again.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration exists, the key is malformed,
    /// or no peer has that key.
    pub async fn execute<W: Write>(
        mut self,
        out: &mut W,
        format: &OutputFormat,
        public_key: &str,
    ) -> Result<(), CliError> {
        let mut model = load_model(&self.store)?;
        let key = PublicKey::from_base64(public_key)?;
        let removed = model.remove_peer(&key)?;
        save_staged(&mut self.store, &model)?;
        info!(peer = %key, "staged peer removal");

        format.write(
            out,
            &RemovePeerOutput {
                public_key: key.to_base64(),
                released: removed
                    .host_addresses()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
        )
    }
}

/// Rebuilds the allocation pool from the model: the interface host and
/// every peer host address in the subnet are reserved, in file order, so
/// allocation picks up where the configuration left off.
fn pool_for(model: &ConfigModel) -> Result<AddressPool, CliError> {
    let Some(subnet) = model.interface().address.as_ipv4() else {
        return Err(CliError::InvalidArgument(
            "address allocation requires an IPv4 interface subnet".to_string(),
        ));
    };
    let mut pool = AddressPool::new(subnet);
    if let IpAddr::V4(addr) = model.interface().address.addr() {
        pool.reserve(addr);
    }
    for peer in model.peers() {
        for addr in peer.host_addresses() {
            if let IpAddr::V4(addr) = addr {
                pool.reserve(addr);
            }
        }
    }
    Ok(pool)
}
