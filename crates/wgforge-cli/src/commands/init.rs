//! Fresh interface configuration.

use std::io::Write;

use tracing::info;
use wgforge::{AllowedIp, ConfigModel, ConfigStore, FileStore, Interface, PrivateKey, WgError};

use crate::cli::InitArgs;
use crate::error::CliError;
use crate::output::{InitOutput, OutputFormat};

use super::save_staged;

/// Handler for `init`.
pub struct InitCommand {
    store: FileStore,
}

impl InitCommand {
    /// Creates a new init command handler.
    #[must_use]
    pub const fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Creates and stages a fresh interface configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration already exists without
    /// `--force`, if the arguments do not form a valid interface, or if
    /// writing fails.
    pub async fn execute<W: Write>(
        mut self,
        out: &mut W,
        format: &OutputFormat,
        args: &InitArgs,
    ) -> Result<(), CliError> {
        if !args.force
            && (self.store.load_staged()?.is_some() || self.store.load_active()?.is_some())
        {
            return Err(CliError::AlreadyExists(
                self.store.staged_path().display().to_string(),
            ));
        }

        let private_key = match &args.private_key {
            Some(b64) => PrivateKey::from_base64(b64)?,
            None => PrivateKey::generate()?,
        };
        let public_key = private_key.public_key();
        let address = AllowedIp::from_cidr(&args.address)?;

        let mut interface = Interface::new(private_key, address);
        if let Some(port) = args.listen_port {
            interface = interface.with_listen_port(port);
        }

        let model = ConfigModel::new(interface);
        let violations = model.validate();
        if !violations.is_empty() {
            return Err(WgError::ValidationFailed(violations).into());
        }

        save_staged(&mut self.store, &model)?;
        info!(path = %self.store.staged_path().display(), "initialized configuration");
        format.write(
            out,
            &InitOutput {
                public_key: public_key.to_base64(),
                address: address.to_cidr(),
                config_path: self.store.staged_path().display().to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    fn store(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("wg0.conf"), dir.path().join("wg0.conf.active"))
    }

    fn args(address: &str) -> InitArgs {
        InitArgs {
            address: address.to_string(),
            listen_port: Some(51820),
            private_key: None,
            force: false,
        }
    }

    #[tokio::test]
    async fn init_writes_parseable_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buf = Vec::new();
        InitCommand::new(store(&dir))
            .execute(&mut buf, &OutputFormat::default(), &args("10.0.0.1/24"))
            .await
            .expect("init");

        let text = std::fs::read_to_string(dir.path().join("wg0.conf")).expect("read");
        let model = wgforge::from_conf(&text).expect("parse");
        assert_eq!(model.interface().listen_port, Some(51820));
        assert_eq!(model.peers().len(), 0);
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fmt = OutputFormat::new(Format::Text);
        let mut buf = Vec::new();
        InitCommand::new(store(&dir))
            .execute(&mut buf, &fmt, &args("10.0.0.1/24"))
            .await
            .expect("first init");

        let again = InitCommand::new(store(&dir))
            .execute(&mut buf, &fmt, &args("10.0.0.1/24"))
            .await;
        assert!(matches!(again, Err(CliError::AlreadyExists(_))));

        let mut forced = args("10.1.0.1/24");
        forced.force = true;
        InitCommand::new(store(&dir))
            .execute(&mut buf, &fmt, &forced)
            .await
            .expect("forced init");
    }

    #[tokio::test]
    async fn init_rejects_unusable_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buf = Vec::new();
        let result = InitCommand::new(store(&dir))
            .execute(&mut buf, &OutputFormat::default(), &args("10.0.0.0/24"))
            .await;
        assert!(matches!(
            result,
            Err(CliError::Wg(WgError::ValidationFailed(_)))
        ));
    }
}
