//! Error types for notesync-core

use thiserror::Error;

use crate::gateway::GatewayError;

/// Result type alias using notesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notesync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any I/O, or a malformed server payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote service unreachable (offline, DNS, connection reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Access token rejected and could not be refreshed
    #[error("Not authorized; please log in again")]
    Unauthorized,

    /// Remote service answered with a non-success status other than 401
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("Storage error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No live note with the given id in the local store
    #[error("Note not found: {0}")]
    NotFound(String),
}

impl From<GatewayError> for Error {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Unauthorized => Self::Unauthorized,
            GatewayError::Server { status, message } => Self::Server { status, message },
            GatewayError::Transport(message) => Self::Transport(message),
            GatewayError::Decode(message) | GatewayError::Validation(message) => {
                Self::Validation(message)
            }
            GatewayError::Storage(message) => Self::Storage(message),
        }
    }
}
