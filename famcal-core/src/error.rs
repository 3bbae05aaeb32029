//! Error types for famcal.

use thiserror::Error;

/// Errors that can occur in famcal operations.
#[derive(Error, Debug)]
pub enum FamcalError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Holiday lookup failed for {year}: {reason}")]
    Holiday { year: i32, reason: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FamcalError {
    fn from(err: serde_json::Error) -> Self {
        FamcalError::Serialization(err.to_string())
    }
}

/// Result type alias for famcal operations.
pub type FamcalResult<T> = Result<T, FamcalError>;
