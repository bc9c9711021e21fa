//! The narrow remote API a schedule trigger is reachable through

use crate::error::ClientResult;
use async_trait::async_trait;
use std::fmt;
use trigger_types::{TriggerIdentity, TriggerProperties, TriggerResource};

/// Remote calls, used for call logs and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    Get,
    CreateOrUpdate,
    Start,
    Stop,
    Delete,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOperation::Get => "get",
            RemoteOperation::CreateOrUpdate => "create_or_update",
            RemoteOperation::Start => "start",
            RemoteOperation::Stop => "stop",
            RemoteOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Handle on an asynchronous remote action
#[async_trait]
pub trait LongRunningOperation: Send {
    /// Poll the remote action until it settles.
    ///
    /// Callers bound the wait with their own deadline.
    async fn wait(self: Box<Self>) -> ClientResult<()>;
}

/// Client trait for the remote trigger endpoint
///
/// Transport, authentication and retries live behind this trait.
#[async_trait]
pub trait RemoteTriggerClient: Send + Sync {
    /// Fetch a trigger; `Ok(None)` when the remote reports it missing
    async fn get(&self, id: &TriggerIdentity) -> ClientResult<Option<TriggerResource>>;

    /// Create the trigger or replace its definition
    async fn create_or_update(
        &self,
        id: &TriggerIdentity,
        properties: TriggerProperties,
    ) -> ClientResult<TriggerResource>;

    /// Begin starting the trigger
    async fn start(&self, id: &TriggerIdentity) -> ClientResult<Box<dyn LongRunningOperation>>;

    /// Begin stopping the trigger
    async fn stop(&self, id: &TriggerIdentity) -> ClientResult<Box<dyn LongRunningOperation>>;

    /// Remove the trigger definition
    async fn delete(&self, id: &TriggerIdentity) -> ClientResult<()>;
}
