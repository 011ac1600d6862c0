// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Plumbing code uses `anyhow`; anything that crosses a subsystem boundary
//! is converted into one of the typed errors below so callers can branch on
//! the kind (for example "no saved state" vs "saved state is corrupt").

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CcnetError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation failed:\n{0}")]
    Validation(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Invalid project state transition for '{project}': {message}")]
    InvalidState { project: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures of the integration-result and run-state stores.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("no saved state for project '{project}'")]
    NotFound { project: String },

    #[error("state file {path:?} is corrupt or unreadable")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to persist state to {path:?}")]
    Persist {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to read state from {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl StateError {
    /// Both a missing and a corrupt file mean "no usable history".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StateError::NotFound { .. } | StateError::Parse { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid URN '{urn}': {reason}")]
pub struct UrnError {
    pub urn: String,
    pub reason: String,
}

/// Client-side failures talking to a remote endpoint.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("unsupported address scheme in '{0}' (expected http:// or tcp://)")]
    UnsupportedScheme(String),

    #[error("transport failure talking to {address}")]
    Transport {
        address: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("call to {address} timed out after {timeout_ms} ms")]
    Timeout { address: String, timeout_ms: u128 },

    #[error("protocol error from {address}: {message}")]
    Protocol { address: String, message: String },
}

/// Failures launching or waiting on an external process.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start '{executable}'")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for '{executable}'")]
    Wait {
        executable: String,
        #[source]
        source: std::io::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CcnetError>;
