//! Remote note service contract and its HTTP implementation.

mod http;
mod wire;

use thiserror::Error;

use crate::models::{NoteId, NoteRecord};

pub use http::HttpGateway;

/// One page of the server's note list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePage {
    pub records: Vec<NoteRecord>,
    /// Page number to request next; `None` on the last page
    pub next_page: Option<u32>,
    /// Total number of notes the server reports for the listing
    pub total: u64,
}

/// Classified failure of a remote call
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials rejected even after one token refresh
    #[error("Unauthorized")]
    Unauthorized,
    /// Non-success HTTP status other than 401
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Network failure; the service could not be reached
    #[error("Transport error: {0}")]
    Transport(String),
    /// Response body did not match the expected shape
    #[error("Malformed server payload: {0}")]
    Decode(String),
    /// Request rejected before any I/O
    #[error("Invalid request: {0}")]
    Validation(String),
    /// Token persistence failed
    #[error("Token storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<crate::Error> for GatewayError {
    fn from(error: crate::Error) -> Self {
        match error {
            crate::Error::Validation(message) => Self::Validation(message),
            crate::Error::Transport(message) => Self::Transport(message),
            crate::Error::Unauthorized => Self::Unauthorized,
            crate::Error::Server { status, message } => Self::Server { status, message },
            other => Self::Storage(other.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Operations the sync engine needs from the remote note service.
///
/// Implementations are stateless per call apart from credential refresh.
#[allow(async_fn_in_trait)]
pub trait RemoteGateway {
    /// Fetch one page of notes, optionally filtered by title.
    async fn list(&self, page: u32, query: Option<&str>) -> GatewayResult<NotePage>;

    /// Create a note and return the server's copy.
    async fn create(&self, title: &str, body: &str) -> GatewayResult<NoteRecord>;

    /// Overwrite a note's fields and return the server's copy.
    async fn update(&self, id: NoteId, title: &str, body: &str) -> GatewayResult<NoteRecord>;

    /// Delete a note.
    async fn delete(&self, id: NoteId) -> GatewayResult<()>;
}
