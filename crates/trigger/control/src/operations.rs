//! Operation types for deadlines, logging and events
//!
//! A public controller call belongs to one [`OperationCategory`], which picks
//! its time budget. Inside a call every remote step is a
//! [`ReconcileOperation`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of public controller call; each category has its own time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationCategory {
    Create,
    Read,
    Update,
    Delete,
}

impl OperationCategory {
    /// Check if the category changes remote state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Read => write!(f, "read"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One remote step inside a reconciliation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcileOperation {
    /// Waiting for another cycle on the same identity to finish
    LockWait,
    /// Existence check before create
    ExistenceCheck,
    Read,
    CreateOrUpdate,
    /// Issuing start and waiting for it
    Start,
    /// Issuing stop and waiting for it
    Stop,
    Delete,
}

impl ReconcileOperation {
    /// Steps that wait on a remote long-running operation
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::Start | Self::Stop)
    }
}

impl fmt::Display for ReconcileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockWait => write!(f, "lock wait"),
            Self::ExistenceCheck => write!(f, "existence check"),
            Self::Read => write!(f, "read"),
            Self::CreateOrUpdate => write!(f, "create/update"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Delete => write!(f, "delete"),
        }
    }
}
