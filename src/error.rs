//! Error types for netsweep.
//!
//! Uses `thiserror` for ergonomic error definitions.

use crate::types::PortParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while the scan is running.
///
/// Individual probe failures never show up here; they are folded into a
/// `Close` result line.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to write result log: {0}")]
    SinkWrite(#[source] std::io::Error),

    #[error("result sink task failed: {0}")]
    SinkTask(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors raised while preparing the inputs of a scan.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read input file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open output file {path}: {source}")]
    OutputFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ports(#[from] PortParseError),
}

/// Result type alias for input preparation.
pub type InputResult<T> = Result<T, InputError>;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error for the command-line program.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
