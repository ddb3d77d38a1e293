//! Output formatting for CLI commands.
//!
//! Supports text (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use wgforge::ApplyState;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both text and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a value to the output in the selected format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TextDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Text => {
                value.write_text(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Text)
    }
}

/// Trait for types with a human-readable text rendering.
pub trait TextDisplay {
    /// Write the value as human-readable text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// A freshly generated key pair.
#[derive(Debug, Clone, Serialize)]
pub struct KeygenOutput {
    /// Base64 private key.
    pub private_key: String,
    /// Base64 public key derived from it.
    pub public_key: String,
}

impl TextDisplay for KeygenOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "PrivateKey = {}", self.private_key)?;
        writeln!(writer, "PublicKey  = {}", self.public_key)?;
        Ok(())
    }
}

/// A freshly generated preshared key.
#[derive(Debug, Clone, Serialize)]
pub struct PskOutput {
    /// Base64 preshared key.
    pub preshared_key: String,
}

impl TextDisplay for PskOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.preshared_key)?;
        Ok(())
    }
}

/// Result of adding a peer.
#[derive(Debug, Clone, Serialize)]
pub struct AddPeerOutput {
    /// The peer's base64 public key.
    pub public_key: String,
    /// The tunnel address assigned to the peer.
    pub address: String,
    /// Preshared key, present only when one was generated here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<String>,
}

impl TextDisplay for AddPeerOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "added peer {}", self.public_key)?;
        writeln!(writer, "  address: {}", self.address)?;
        if let Some(psk) = &self.preshared_key {
            writeln!(writer, "  preshared key: {psk}")?;
        }
        Ok(())
    }
}

/// Result of initializing a configuration.
#[derive(Debug, Clone, Serialize)]
pub struct InitOutput {
    /// The interface's base64 public key.
    pub public_key: String,
    /// Interface address in CIDR notation.
    pub address: String,
    /// Path the configuration was written to.
    pub config_path: String,
}

impl TextDisplay for InitOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "initialized {}", self.config_path)?;
        writeln!(writer, "  address:    {}", self.address)?;
        writeln!(writer, "  public key: {}", self.public_key)?;
        Ok(())
    }
}

/// Result of removing a peer.
#[derive(Debug, Clone, Serialize)]
pub struct RemovePeerOutput {
    /// The removed peer's base64 public key.
    pub public_key: String,
    /// Tunnel addresses released back to the pool.
    pub released: Vec<String>,
}

impl TextDisplay for RemovePeerOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "removed peer {}", self.public_key)?;
        for addr in &self.released {
            writeln!(writer, "  released: {addr}")?;
        }
        Ok(())
    }
}

/// Resulting lifecycle state after apply or teardown.
#[derive(Debug, Clone, Serialize)]
pub struct StateOutput {
    /// Lifecycle state of the configuration.
    pub state: ApplyState,
    /// Number of live peers.
    pub peer_count: usize,
}

impl TextDisplay for StateOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "state: {}", self.state)?;
        writeln!(writer, "peers: {}", self.peer_count)?;
        Ok(())
    }
}

/// Configuration summary for `show`.
#[derive(Debug, Clone, Serialize)]
pub struct ShowOutput {
    /// Lifecycle state of the configuration.
    pub state: ApplyState,
    /// Interface address in CIDR notation.
    pub address: String,
    /// UDP listen port, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
    /// Number of configured peers.
    pub peer_count: usize,
    /// The configuration text itself.
    pub config: String,
}

impl TextDisplay for ShowOutput {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "state: {}", self.state)?;
        writeln!(writer, "peers: {}", self.peer_count)?;
        writeln!(writer)?;
        write!(writer, "{}", self.config)?;
        Ok(())
    }
}
