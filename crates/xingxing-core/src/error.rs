//! Core error types for xingxing-core.
//!
//! The settlement engine has a deliberately small taxonomy ([`SettleError`]).
//! Everything else (storage, config, validation) is gathered into
//! [`CoreError`] for callers that drive the engine against persistent state.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for xingxing-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settlement precondition violations
    #[error(transparent)]
    Settle(#[from] SettleError),

    /// Parent confirmation precondition violations
    #[error(transparent)]
    Confirm(#[from] ConfirmError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A record looked up by id does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True for the local, recoverable failures a UI should show as a notice.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::Settle(_) | CoreError::Confirm(_))
    }
}

/// Settlement engine errors.
///
/// Both are recoverable: the caller is expected to ignore the action or
/// show a short notice.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleError {
    /// The task was already settled for this calendar day.
    #[error("task already completed today")]
    AlreadyCompleted,

    /// There is no completion for today that can be reversed.
    #[error("nothing to undo")]
    NothingToUndo,
}

/// Parent confirmation errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("task does not require parent confirmation")]
    NotRequired,

    #[error("task has not been completed today")]
    NotCompleted,

    #[error("task already confirmed")]
    AlreadyConfirmed,
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored column could not be decoded
    #[error("Corrupt value in column '{column}': {value}")]
    CorruptValue { column: &'static str, value: String },

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

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home or data directory could not be resolved
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Drug name that is not in the registry
    #[error("Unknown drug: {0}")]
    UnknownDrug(String),

    /// Formulation id that does not belong to the drug
    #[error("Unknown formulation '{formulation}' for {drug}")]
    UnknownFormulation { drug: String, formulation: String },

    /// Spending more points than the child holds
    #[error("Insufficient points: balance {balance}, requested {requested}")]
    InsufficientPoints { balance: i64, requested: u32 },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
