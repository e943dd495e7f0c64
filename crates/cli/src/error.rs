//! CLI error type.

use thiserror::Error;

use qkart_storefront::ClientError;
use qkart_storefront::config::ConfigError;

/// Errors that end a `qkart` command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A storefront operation failed.
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Reading stdin or writing stdout failed.
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for `CliError`.
pub type Result<T> = std::result::Result<T, CliError>;
