// src/utils/error.rs
use std::io;
use thiserror::Error;

/// Main error type for the drops miner
///
/// Covers faults raised by the platform client, configuration and
/// persistence problems, and invalid input arriving through the control API.
#[derive(Error, Debug)]
pub enum MinerError {
    /// The platform demanded an interactive authentication challenge
    /// (captcha). Recoverable only by operator intervention.
    #[error("Authentication challenge required")]
    AuthChallenge,

    /// Any other failure reported by the platform client
    #[error("Client error: {0}")]
    ClientError(String),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Settings file parse errors
    #[error("TOML parse error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    /// Settings file serialization errors
    #[error("TOML write error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Control API could not bind its listener
    #[error("Bind error: {0}")]
    BindError(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

/// Converts async task join errors into MinerError
///
/// Used when a background task (worker run, API server) fails unexpectedly.
/// Wraps the original error in a `TaskError` variant.
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}

impl MinerError {
    /// True for faults an operator is expected to resolve by hand
    pub fn is_auth_challenge(&self) -> bool {
        matches!(self, MinerError::AuthChallenge)
    }
}
