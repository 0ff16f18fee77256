//! Core error types for somnus-core.
//!
//! Two families live here. The `thiserror` hierarchy under [`CoreError`]
//! covers storage, configuration and validation. [`BackendError`] and
//! [`PlaybackErrorKind`] cover playback: backend calls fail per call and are
//! converted at the call site, so none of them ever escapes as a fault.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for somnus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to write configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Session durations are whole minutes and must be positive
    #[error("Invalid session duration: {seconds} seconds (must be greater than zero)")]
    InvalidDuration { seconds: u64 },

    /// Operation not allowed in the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

/// A single backend call was rejected.
///
/// These are per-call and recoverable: the router falls back, the sequencer
/// retries, and only an exhausted retry budget becomes a
/// [`PlaybackErrorKind`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The media element has not buffered enough to start.
    #[error("media is not loaded yet")]
    NotLoaded,

    /// Autoplay policy refused playback (no qualifying user gesture).
    #[error("autoplay blocked: no user gesture observed")]
    AutoplayBlocked,

    /// The native bridge returned `false`.
    #[error("native bridge rejected {op}")]
    BridgeRejected { op: &'static str },

    /// The backend has no such capability.
    #[error("{op} is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        op: &'static str,
    },

    /// No source is configured for the track.
    #[error("no media source configured for {0}")]
    MissingSource(String),

    /// Anything else the media layer reported.
    #[error("media error: {0}")]
    Media(String),
}

/// Failure kinds surfaced to the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackErrorKind {
    /// Not a failure: the request was queued until the first gesture.
    GestureNotYetObserved,
    /// The native bridge is absent or refused a call; local media was used.
    BackendUnavailable,
    /// A track could not be started within the attempt budget.
    PlaybackStartFailure,
    /// A track never resolved its start within the load timeout.
    LoadTimeout,
    /// The session store refused the completed-session record.
    PersistenceFailure,
    /// The notification collaborator could not deliver.
    NotificationFailure,
}

/// Notification delivery errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notifications are not available on this host")]
    Unavailable,

    #[error("notification failed: {0}")]
    Failed(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
