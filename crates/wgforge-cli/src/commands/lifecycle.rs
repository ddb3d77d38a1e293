//! Configuration lifecycle: apply, teardown, show.

use std::io::Write;

use tracing::info;
use wgforge::{
    from_conf, ApplyState, ConfigStore, FileStore, InterfaceApplier, MemoryBackend,
};

use crate::error::CliError;
use crate::output::{OutputFormat, ShowOutput, StateOutput};

/// Handler for `apply`.
pub struct ApplyCommand {
    store: FileStore,
}

impl ApplyCommand {
    /// Creates a new apply command handler.
    #[must_use]
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Validates the staged configuration and promotes it to active.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is staged, validation fails, or the
    /// apply itself fails or times out.
    pub async fn execute<W: Write>(
        self,
        out: &mut W,
        format: &OutputFormat,
    ) -> Result<(), CliError> {
        let Some(text) = self.store.load_staged()? else {
            return Err(CliError::NoConfig(
                self.store.staged_path().display().to_string(),
            ));
        };
        let model = from_conf(&text)?;

        let applier = InterfaceApplier::resume(MemoryBackend::new(), self.store)?;
        applier.stage(model).await?;
        applier.apply().await?;

        let peer_count = applier
            .active_model()
            .await
            .map_or(0, |m| m.peers().len());
        info!(peers = peer_count, "promoted staged configuration to active");
        format.write(
            out,
            &StateOutput {
                state: applier.state().await,
                peer_count,
            },
        )
    }
}

/// Handler for `teardown`.
pub struct TeardownCommand {
    store: FileStore,
}

impl TeardownCommand {
    /// Creates a new teardown command handler.
    #[must_use]
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Removes the live configuration and both stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored snapshot cannot be read or the
    /// teardown times out.
    pub async fn execute<W: Write>(
        self,
        out: &mut W,
        format: &OutputFormat,
    ) -> Result<(), CliError> {
        let applier = InterfaceApplier::resume(MemoryBackend::new(), self.store)?;
        applier.teardown().await?;
        info!("removed configuration and stored snapshots");
        format.write(
            out,
            &StateOutput {
                state: applier.state().await,
                peer_count: 0,
            },
        )
    }
}

/// Handler for `show`.
pub struct ShowCommand {
    store: FileStore,
}

impl ShowCommand {
    /// Creates a new show command handler.
    #[must_use]
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Prints the current configuration and its lifecycle state. The
    /// staged configuration wins over the active one when both exist.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration exists or one cannot be
    /// parsed.
    pub async fn execute<W: Write>(
        self,
        out: &mut W,
        format: &OutputFormat,
    ) -> Result<(), CliError> {
        let staged = self.store.load_staged()?;
        let (state, text) = match (staged, self.store.load_active()?) {
            (Some(text), _) => (ApplyState::Staged, text),
            (None, Some(text)) => (ApplyState::Active, text),
            (None, None) => {
                return Err(CliError::NoConfig(
                    self.store.staged_path().display().to_string(),
                ))
            }
        };
        let model = from_conf(&text)?;

        format.write(
            out,
            &ShowOutput {
                state,
                address: model.interface().address.to_cidr(),
                listen_port: model.interface().listen_port,
                peer_count: model.peers().len(),
                config: text,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgforge::{to_conf, AllowedIp, ConfigModel, Interface, Peer, PrivateKey, WgError, KEY_SIZE};

    fn store(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("wg0.conf"), dir.path().join("wg0.conf.active"))
    }

    fn model() -> ConfigModel {
        let interface = Interface::new(
            PrivateKey::from_bytes_clamped([1u8; KEY_SIZE]),
            AllowedIp::from_cidr("10.0.0.1/24").expect("valid cidr"),
        );
        let mut model = ConfigModel::new(interface);
        let peer = Peer::new(PrivateKey::from_bytes_clamped([2u8; KEY_SIZE]).public_key())
            .with_allowed_ip(AllowedIp::from_cidr("10.0.0.2/32").expect("valid cidr"));
        model.add_peer(peer).expect("add peer");
        model
    }

    #[tokio::test]
    async fn apply_promotes_staged_to_active() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        store.save_staged(&to_conf(&model())).expect("seed");

        let mut buf = Vec::new();
        ApplyCommand::new(store.clone())
            .execute(&mut buf, &OutputFormat::default())
            .await
            .expect("apply");

        assert_eq!(store.load_staged().expect("load"), None);
        let active = store.load_active().expect("load").expect("active text");
        assert_eq!(from_conf(&active).expect("parse").peers().len(), 1);
    }

    #[tokio::test]
    async fn apply_without_staged_config_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buf = Vec::new();
        let result = ApplyCommand::new(store(&dir))
            .execute(&mut buf, &OutputFormat::default())
            .await;
        assert!(matches!(result, Err(CliError::NoConfig(_))));
    }

    #[tokio::test]
    async fn apply_surfaces_validation_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        // A peer section with no AllowedIPs parses but does not validate.
        let text = format!(
            "{}\n[Peer]\nPublicKey = {}\n",
            to_conf(&model()).trim_end(),
            PrivateKey::from_bytes_clamped([3u8; KEY_SIZE])
                .public_key()
                .to_base64()
        );
        store.save_staged(&text).expect("seed");

        let mut buf = Vec::new();
        let result = ApplyCommand::new(store)
            .execute(&mut buf, &OutputFormat::default())
            .await;
        assert!(matches!(
            result,
            Err(CliError::Wg(WgError::ValidationFailed(_)))
        ));
    }

    #[tokio::test]
    async fn teardown_removes_both_snapshots() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        store.save_staged(&to_conf(&model())).expect("seed");
        store.save_active(&to_conf(&model())).expect("seed");

        let mut buf = Vec::new();
        TeardownCommand::new(store.clone())
            .execute(&mut buf, &OutputFormat::default())
            .await
            .expect("teardown");

        assert_eq!(store.load_staged().expect("load"), None);
        assert_eq!(store.load_active().expect("load"), None);
    }

    #[tokio::test]
    async fn show_prefers_staged_over_active() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        store.save_active(&to_conf(&model())).expect("seed");
        store.save_staged(&to_conf(&model())).expect("seed");

        let mut buf = Vec::new();
        ShowCommand::new(store)
            .execute(&mut buf, &OutputFormat::default())
            .await
            .expect("show");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("state: staged\n"));
        assert!(text.contains("[Interface]"));
    }
}
