//! Error types for the CLI application.

use rapport_processor::CommandError;
use rapport_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The scenario script is malformed or inconsistent
    #[error("Script error: {0}")]
    Script(String),

    /// A command failed outside of a scripted step
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// In-memory service error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Steps whose result did not match their expectation
    #[error("{0} step(s) did not meet their expectation")]
    ExpectationFailed(usize),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}
