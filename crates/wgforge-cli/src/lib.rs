//! # wgforge-cli
//!
//! Command-line interface for WireGuard configuration management.
//!
//! Provides commands for:
//! - Key and preshared-key generation
//! - Interface configuration bootstrap
//! - Peer addition and removal with address allocation
//! - Staged apply, teardown, and inspection
//!
//! # Architecture
//!
//! Commands edit a staged configuration file; `apply` validates it and
//! promotes it to the active snapshot through an
//! [`wgforge::InterfaceApplier`].
//!
//! ```text
//! init / add-peer / remove-peer ──► wg0.conf (staged)
//!                                       │ apply
//!                                       ▼
//!                                  wg0.conf.active
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{AddPeerArgs, Cli, Commands, Format, InitArgs};
pub use error::CliError;
pub use output::OutputFormat;
