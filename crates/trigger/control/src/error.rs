//! Error types for trigger reconciliation

use crate::operations::ReconcileOperation;
use thiserror::Error;
use trigger_client::ClientError;
use trigger_types::{IdentityParseError, TriggerIdentity};

/// Reconciliation error type
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed identifier string
    #[error("parsing trigger identifier: {0}")]
    Parse(#[from] IdentityParseError),

    /// Create requested for a name already bound remotely; it must be imported
    #[error("a resource with the ID {id:?} already exists - to be managed it needs to be imported")]
    AlreadyExists { id: String },

    /// An existing trigger was expected but the remote has none
    #[error("{identity} was not found")]
    NotFound { identity: TriggerIdentity },

    /// The remote object is a different trigger kind
    #[error("classifying {identity}: expected {expected:?}, received {actual:?}")]
    Classification {
        identity: TriggerIdentity,
        expected: &'static str,
        actual: String,
    },

    #[error("retrieving {identity}: {source}")]
    ReadFailed {
        identity: TriggerIdentity,
        #[source]
        source: ClientError,
    },

    #[error("creating/updating {identity}: {source}")]
    UpdateFailed {
        identity: TriggerIdentity,
        #[source]
        source: ClientError,
    },

    #[error("starting {identity}: {source}")]
    StartFailed {
        identity: TriggerIdentity,
        #[source]
        source: ClientError,
    },

    #[error("stopping {identity}: {source}")]
    StopFailed {
        identity: TriggerIdentity,
        #[source]
        source: ClientError,
    },

    #[error("deleting {identity}: {source}")]
    DeleteFailed {
        identity: TriggerIdentity,
        #[source]
        source: ClientError,
    },

    /// Deadline passed or the request was cancelled while waiting
    #[error("timed out waiting on {operation} of {identity}")]
    Timeout {
        identity: TriggerIdentity,
        operation: ReconcileOperation,
    },
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;

impl ReconcileError {
    /// Whether re-running the whole cycle can succeed without caller changes
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Parse(_) | Self::AlreadyExists { .. } | Self::Classification { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Identity the error refers to, when one was resolved
    pub fn identity(&self) -> Option<&TriggerIdentity> {
        match self {
            Self::Parse(_) | Self::AlreadyExists { .. } => None,
            Self::NotFound { identity }
            | Self::Classification { identity, .. }
            | Self::ReadFailed { identity, .. }
            | Self::UpdateFailed { identity, .. }
            | Self::StartFailed { identity, .. }
            | Self::StopFailed { identity, .. }
            | Self::DeleteFailed { identity, .. }
            | Self::Timeout { identity, .. } => Some(identity),
        }
    }
}
