//! Key generation commands.

use std::io::Write;

use wgforge::{KeyPair, PresharedKey};

use crate::error::CliError;
use crate::output::{KeygenOutput, OutputFormat, PskOutput};

/// Handler for `keygen` and `genpsk`.
pub struct KeygenCommand;

impl KeygenCommand {
    /// Generates and prints a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the system entropy source is unavailable.
    pub fn keypair<W: Write>(out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let pair = KeyPair::generate()?;
        format.write(
            out,
            &KeygenOutput {
                private_key: pair.private_key().to_base64(),
                public_key: pair.public_key().to_base64(),
            },
        )
    }

    /// Generates and prints a fresh preshared key.
    ///
    /// # Errors
    ///
    /// Returns an error if the system entropy source is unavailable.
    pub fn preshared<W: Write>(out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let key = PresharedKey::generate()?;
        format.write(
            out,
            &PskOutput {
                preshared_key: key.to_base64(),
            },
        )
    }
}
