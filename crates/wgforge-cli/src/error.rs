//! CLI error types and exit-code mapping.

use std::fmt;

use wgforge::WgError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// No configuration exists where one is required.
    NoConfig(String),
    /// A configuration already exists and `--force` was not given.
    AlreadyExists(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// Output formatting error.
    Format(String),
    /// An error from the configuration library.
    Wg(WgError),
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Maps the error to the process exit code.
    ///
    /// Validation and model errors exit 3, apply and timeout errors exit
    /// 4, everything else exits 1. Usage errors exit 2 via clap before a
    /// `CliError` ever exists.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument(_) => 3,
            Self::Wg(e) => match e {
                WgError::ApplyFailed(_) | WgError::Timeout(_) => 4,
                WgError::EntropyUnavailable(_) | WgError::Io(_) => 1,
                _ => 3,
            },
            Self::NoConfig(_) | Self::AlreadyExists(_) | Self::Format(_) | Self::Io(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfig(path) => write!(f, "no configuration at {path}; run init first"),
            Self::AlreadyExists(path) => {
                write!(f, "configuration already exists at {path}; use --force to overwrite")
            }
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Wg(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wg(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WgError> for CliError {
    fn from(err: WgError) -> Self {
        Self::Wg(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
