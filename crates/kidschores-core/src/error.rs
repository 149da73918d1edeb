//! Core error types for kidschores-core.
//!
//! Lookup and validation failures are raised before any state is touched,
//! so a returned error always means the entity store is unchanged.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::ChoreState;

/// Core error type for kidschores-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A name or ID did not resolve to a known entity
    #[error("{kind} not found: {name}")]
    Lookup { kind: &'static str, name: String },

    /// Kid is not in the chore's assigned set
    #[error("kid '{kid}' is not assigned to chore '{chore}'")]
    NotAssigned { kid: String, chore: String },

    /// Parent is not associated with the kid
    #[error("parent '{parent}' is not authorized for kid '{kid}'")]
    NotAuthorized { parent: String, kid: String },

    /// Operation not valid from the current lifecycle state
    #[error("cannot {action} {entity}: current state is {state}")]
    InvalidState {
        entity: String,
        state: String,
        action: &'static str,
    },

    /// Reward cost exceeds the kid's balance
    #[error("insufficient points: needed {needed}, available {available}")]
    InsufficientPoints { needed: f64, available: f64 },

    /// Another kid already claimed a shared_first chore
    #[error("chore '{chore}' was already claimed by {claimed_by}")]
    AlreadyClaimed { chore: String, claimed_by: String },

    /// Storage load/save failures
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Input validation errors
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn lookup(kind: &'static str, name: impl Into<String>) -> Self {
        CoreError::Lookup {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_state(
        entity: impl Into<String>,
        state: ChoreState,
        action: &'static str,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            state: state.to_string(),
            action,
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored document is not valid JSON
    #[error("Malformed document '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Document schema is newer than this build understands
    #[error("Unsupported schema version {found} (max {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    /// Failure raised by a test backend
    #[error("Injected failure: {0}")]
    Injected(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
