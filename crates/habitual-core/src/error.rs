//! Core error types for habitual-core.
//!
//! One thiserror enum per concern, with `CoreError` as the umbrella type
//! used by storage-level operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitual-core.
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

    /// Calendar collaborator errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Slot suggestion errors
    #[error("Suggestion error: {0}")]
    Suggest(#[from] SuggestError),

    /// Requested habit does not exist
    #[error("Habit not found: {0}")]
    HabitNotFound(String),

    /// Id prefix matches more than one habit
    #[error("Habit id prefix '{prefix}' is ambiguous: {matches} habits match")]
    AmbiguousHabit { prefix: String, matches: usize },

    /// Requested event does not exist
    #[error("Event not found: {0}")]
    EventNotFound(String),

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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

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

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Unparsable time of day
    #[error("Invalid time of day '{0}': expected HH:mm")]
    InvalidTimeOfDay(String),

    /// Time window that wraps past midnight
    #[error("Invalid time window: start ({start}) is after end ({end})")]
    ReversedWindow { start: String, end: String },

    /// Weekday index outside 0..=6
    #[error("Invalid weekday index {0}: expected 0 (Sunday) to 6 (Saturday)")]
    InvalidWeekday(u8),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failures surfaced by a calendar collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    /// The user has not granted calendar access
    #[error("calendar permission denied")]
    PermissionDenied,

    /// The provider could not be reached or refused the request
    #[error("calendar provider unavailable: {0}")]
    Unavailable(String),

    /// Local event storage failed
    #[error("calendar storage failed: {0}")]
    Storage(String),
}

/// Errors returned by the slot suggester.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SuggestError {
    /// Events for the day could not be read; no slot is suggested
    #[error("could not read calendar events: {0}")]
    CalendarUnavailable(#[from] CalendarError),

    /// Requested slot duration was zero
    #[error("slot duration must be positive, got {0} minutes")]
    InvalidDuration(u32),

    /// Suggester configuration is out of range
    #[error("invalid suggestion settings: {0}")]
    InvalidConfig(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
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

impl From<rusqlite::Error> for CalendarError {
    fn from(err: rusqlite::Error) -> Self {
        CalendarError::Storage(err.to_string())
    }
}

impl From<CoreError> for CalendarError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Calendar(e) => e,
            other => CalendarError::Storage(other.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
