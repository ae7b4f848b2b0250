// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcmuxError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("invalid duration for {field} in command '{command}': {reason} (got {value:?})")]
    InvalidDuration {
        field: &'static str,
        command: String,
        value: String,
        reason: String,
    },

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to initialize output routing: {0}")]
    OutputInit(#[source] std::io::Error),

    #[error("Setup command '{command}' failed after retries")]
    SetupFailure { command: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProcmuxError>;
