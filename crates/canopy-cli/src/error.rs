//! Error types for the Canopy CLI

use canopy_core::CoreError;
use canopy_dsl::DslError;
use canopy_stdlib::StdlibError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// A `key=value` argument without `=`
    #[error("Expected key=value, got '{0}'")]
    InvalidKeyValue(String),

    /// A view id argument that does not parse
    #[error("Invalid view id: {0}")]
    InvalidViewId(String),

    /// The `--data` payload is not JSON
    #[error("Invalid initial data: {0}")]
    InvalidData(String),

    /// The document extension is neither JSON nor YAML
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The document could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The document failed to decode or validate
    #[error(transparent)]
    Decode(#[from] DslError),

    /// The transport could not be set up
    #[error(transparent)]
    Transport(#[from] StdlibError),

    /// The render session failed
    #[error(transparent)]
    Session(#[from] CoreError),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
