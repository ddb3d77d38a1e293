//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`keygen`] - Key and preshared-key generation
//! - [`init`] - Fresh interface configuration
//! - [`peer`] - Peer addition and removal
//! - [`lifecycle`] - Apply, teardown, show

pub mod init;
pub mod keygen;
pub mod lifecycle;
pub mod peer;

pub use init::InitCommand;
pub use keygen::KeygenCommand;
pub use lifecycle::{ApplyCommand, ShowCommand, TeardownCommand};
pub use peer::{AddPeerCommand, RemovePeerCommand};

use wgforge::{from_conf, to_conf, ConfigModel, ConfigStore, FileStore};

use crate::error::CliError;

/// Loads the editable model: the staged slot when present, otherwise the
/// last applied snapshot.
fn load_model(store: &FileStore) -> Result<ConfigModel, CliError> {
    let text = match store.load_staged()? {
        Some(text) => Some(text),
        None => store.load_active()?,
    };
    match text {
        Some(text) => Ok(from_conf(&text)?),
        None => Err(CliError::NoConfig(
            store.staged_path().display().to_string(),
        )),
    }
}

/// Serializes the model into the staged slot.
fn save_staged(store: &mut FileStore, model: &ConfigModel) -> Result<(), CliError> {
    store.save_staged(&to_conf(model))?;
    Ok(())
}
