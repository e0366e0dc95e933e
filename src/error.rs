//! Unified error type hierarchy for WASM Builder
//!
//! Provides structured error handling with ConfigError, BuildError and AppError.

use std::io;
use thiserror::Error;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build orchestration errors.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The external program could not be started at all
    #[error("Failed to spawn '{cmd}': {reason}")]
    SpawnFailed { cmd: String, reason: String },

    #[error("Image build failed: {0}")]
    ImageBuildFailed(String),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Failed to read command output: {0}")]
    OutputCapture(String),
}

/// Errors surfaced to the user by the command-line front end.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Mount path cannot be passed to the container runtime
    #[error("Invalid mount path: {0}")]
    InvalidPath(String),

    /// File I/O error (read/write/delete)
    #[error("I/O error: {0}")]
    Io(String),

    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Get a user-facing error message suitable for console display
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidPath(msg) => format!("Cannot mount project directory: {}", msg),
            AppError::Io(msg) => format!("File operation failed: {}", msg),
            AppError::Config(msg) => format!("Could not load configuration: {}", msg),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
