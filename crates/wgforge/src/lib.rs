//! WireGuard configuration management: key generation, peer address
//! allocation, a validated configuration model, the standard `.conf`
//! wire format, and staged application to a live interface.
//!
//! The crate is the library behind the `wgforge` CLI but stands on its
//! own: build a [`ConfigModel`], serialize it with [`to_conf`], and
//! drive a [`InterfaceApplier`] to push it to a backend.

pub mod alloc;
pub mod apply;
pub mod conf;
pub mod error;
pub mod keys;
pub mod model;
pub mod store;
pub mod types;

pub use alloc::AddressPool;
pub use apply::{
    ApplyState, InterfaceApplier, MemoryBackend, WgBackend, DEFAULT_APPLY_TIMEOUT,
};
pub use conf::{from_conf, to_conf};
pub use error::{Result, WgError};
pub use keys::{KeyPair, PresharedKey, PrivateKey, PublicKey, KEY_SIZE};
pub use model::{ConfigModel, Interface, Peer, Violation};
pub use store::{ConfigStore, FileStore, MemoryStore};
pub use types::{AllowedIp, Endpoint};
