//! Command-line argument parsing with clap.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// wgforge - WireGuard configuration management.
#[derive(Parser, Debug, Clone)]
#[command(name = "wgforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path of the editable (staged) configuration file.
    #[arg(short, long, env = "WGFORGE_CONFIG", default_value = "wg0.conf")]
    pub config: PathBuf,

    /// Path of the applied (active) configuration snapshot.
    ///
    /// Defaults to the staged path with `.active` appended.
    #[arg(long, env = "WGFORGE_ACTIVE")]
    pub active: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the active snapshot path, derived from the staged path when
    /// not given explicitly.
    #[must_use]
    pub fn active_path(&self) -> PathBuf {
        self.active.clone().unwrap_or_else(|| {
            let mut name = self.config.as_os_str().to_os_string();
            name.push(".active");
            PathBuf::from(name)
        })
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate a new private/public key pair.
    Keygen,

    /// Generate a new preshared key.
    Genpsk,

    /// Create a fresh interface configuration.
    Init(InitArgs),

    /// Add a peer to the configuration.
    AddPeer(AddPeerArgs),

    /// Remove a peer from the configuration.
    RemovePeer {
        /// Base64 public key of the peer to remove.
        public_key: String,
    },

    /// Validate the staged configuration and apply it.
    Apply,

    /// Remove the live configuration and both stored snapshots.
    Teardown,

    /// Show the current configuration and its lifecycle state.
    Show,
}

/// Arguments for `init`.
#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    /// Interface address in CIDR notation, e.g. 10.0.0.1/24.
    #[arg(long)]
    pub address: String,

    /// UDP listen port.
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Base64 private key. Generated when omitted.
    #[arg(long)]
    pub private_key: Option<String>,

    /// Overwrite an existing configuration.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `add-peer`.
#[derive(clap::Args, Debug, Clone)]
pub struct AddPeerArgs {
    /// Base64 public key of the peer.
    pub public_key: String,

    /// Allowed networks in CIDR notation, comma-separated. When omitted,
    /// a single host address is allocated from the interface subnet.
    pub allowed_ips: Option<String>,

    /// Specific tunnel address to assign from the interface subnet.
    #[arg(long, conflicts_with = "allowed_ips")]
    pub address: Option<Ipv4Addr>,

    /// Peer endpoint as host:port.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Persistent keepalive interval in seconds.
    #[arg(long)]
    pub keepalive: Option<u16>,

    /// Base64 preshared key for this peer.
    #[arg(long, conflicts_with = "gen_psk")]
    pub psk: Option<String>,

    /// Generate a fresh preshared key for this peer.
    #[arg(long)]
    pub gen_psk: bool,
}
