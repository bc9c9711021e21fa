//! Error types for remote trigger calls

use thiserror::Error;

/// Failure reported by the remote API or the transport in front of it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The addressed trigger does not exist
    #[error("trigger not found")]
    NotFound,

    /// The remote system refused the call in the object's current state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success response
    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }
}

/// Result type for remote calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;
