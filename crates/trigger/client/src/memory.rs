//! In-memory remote for development and testing
//!
//! Behaves like the remote endpoint closely enough to exercise a controller:
//! runtime state survives definition updates, start/stop settle when their
//! operation is awaited, and a running trigger cannot be deleted.

use crate::client::{LongRunningOperation, RemoteOperation, RemoteTriggerClient};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use trigger_types::{RuntimeState, TriggerIdentity, TriggerProperties, TriggerResource};

/// One call received by the in-memory remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: RemoteOperation,
    pub address: String,
}

type TriggerTable = Arc<RwLock<HashMap<String, TriggerResource>>>;

/// In-memory trigger endpoint
#[derive(Debug, Default)]
pub struct InMemoryTriggerClient {
    triggers: TriggerTable,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    failures: Arc<RwLock<HashMap<RemoteOperation, ClientError>>>,
    stalled: Arc<RwLock<HashSet<RemoteOperation>>>,
    lowercase_group_echo: bool,
}

impl InMemoryTriggerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo resource groups in lower case, like the real endpoint does
    pub fn with_lowercase_group_echo() -> Self {
        Self {
            lowercase_group_echo: true,
            ..Self::default()
        }
    }

    /// Store a trigger directly, bypassing the call log
    pub async fn insert(&self, id: &TriggerIdentity, properties: TriggerProperties) {
        let resource = self.resource_for(id, properties, None);
        self.triggers.write().await.insert(storage_key(id), resource);
    }

    /// Current remote copy of a trigger
    pub async fn trigger(&self, id: &TriggerIdentity) -> Option<TriggerResource> {
        self.triggers.read().await.get(&storage_key(id)).cloned()
    }

    /// Make every future call of `operation` fail with `error`
    pub async fn fail_on(&self, operation: RemoteOperation, error: ClientError) {
        self.failures.write().await.insert(operation, error);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// Make the long-running operation behind `operation` never settle
    pub async fn stall(&self, operation: RemoteOperation) {
        self.stalled.write().await.insert(operation);
    }

    /// Calls received so far, oldest first
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Operations received so far, oldest first
    pub async fn operations(&self) -> Vec<RemoteOperation> {
        self.calls.read().await.iter().map(|c| c.operation).collect()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, operation: RemoteOperation, id: &TriggerIdentity) -> ClientResult<()> {
        debug!(%operation, trigger = %id, "In-memory remote call");
        self.calls.write().await.push(RecordedCall {
            operation,
            address: id.address_path(),
        });

        match self.failures.read().await.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn resource_for(
        &self,
        id: &TriggerIdentity,
        mut properties: TriggerProperties,
        existing: Option<RuntimeState>,
    ) -> TriggerResource {
        let mut echoed = id.clone();
        if self.lowercase_group_echo {
            echoed.resource_group = echoed.resource_group.to_lowercase();
        }

        if let TriggerProperties::ScheduleTrigger(props) = &mut properties {
            props.runtime_state = Some(
                existing.unwrap_or_else(|| props.runtime_state.unwrap_or(RuntimeState::Stopped)),
            );
        }

        TriggerResource {
            id: echoed.address_path(),
            name: id.trigger_name.clone(),
            etag: None,
            properties,
        }
    }

    async fn transition(
        &self,
        id: &TriggerIdentity,
        operation: RemoteOperation,
        pending: RuntimeState,
        settled: RuntimeState,
    ) -> ClientResult<Box<dyn LongRunningOperation>> {
        self.record(operation, id).await?;

        let key = storage_key(id);
        {
            let mut triggers = self.triggers.write().await;
            let resource = triggers.get_mut(&key).ok_or(ClientError::NotFound)?;
            set_runtime_state(&mut resource.properties, pending);
        }

        Ok(Box::new(InMemoryOperation {
            triggers: self.triggers.clone(),
            key,
            settled,
            stalled: self.stalled.read().await.contains(&operation),
        }))
    }
}

#[async_trait]
impl RemoteTriggerClient for InMemoryTriggerClient {
    async fn get(&self, id: &TriggerIdentity) -> ClientResult<Option<TriggerResource>> {
        self.record(RemoteOperation::Get, id).await?;
        Ok(self.triggers.read().await.get(&storage_key(id)).cloned())
    }

    async fn create_or_update(
        &self,
        id: &TriggerIdentity,
        properties: TriggerProperties,
    ) -> ClientResult<TriggerResource> {
        self.record(RemoteOperation::CreateOrUpdate, id).await?;

        let key = storage_key(id);
        let mut triggers = self.triggers.write().await;
        let existing = triggers.get(&key).map(|r| r.properties.runtime_state());
        let resource = self.resource_for(id, properties, existing);
        triggers.insert(key, resource.clone());
        Ok(resource)
    }

    async fn start(&self, id: &TriggerIdentity) -> ClientResult<Box<dyn LongRunningOperation>> {
        self.transition(
            id,
            RemoteOperation::Start,
            RuntimeState::Starting,
            RuntimeState::Started,
        )
        .await
    }

    async fn stop(&self, id: &TriggerIdentity) -> ClientResult<Box<dyn LongRunningOperation>> {
        self.transition(
            id,
            RemoteOperation::Stop,
            RuntimeState::Stopping,
            RuntimeState::Stopped,
        )
        .await
    }

    async fn delete(&self, id: &TriggerIdentity) -> ClientResult<()> {
        self.record(RemoteOperation::Delete, id).await?;

        let key = storage_key(id);
        let mut triggers = self.triggers.write().await;
        if let Some(resource) = triggers.get(&key) {
            if resource.properties.runtime_state() != RuntimeState::Stopped {
                return Err(ClientError::Conflict(format!(
                    "trigger {} must be stopped before it is deleted",
                    id.trigger_name
                )));
            }
        }
        triggers.remove(&key);
        Ok(())
    }
}

struct InMemoryOperation {
    triggers: TriggerTable,
    key: String,
    settled: RuntimeState,
    stalled: bool,
}

#[async_trait]
impl LongRunningOperation for InMemoryOperation {
    async fn wait(self: Box<Self>) -> ClientResult<()> {
        if self.stalled {
            std::future::pending::<()>().await;
        }

        let mut triggers = self.triggers.write().await;
        let resource = triggers.get_mut(&self.key).ok_or(ClientError::NotFound)?;
        set_runtime_state(&mut resource.properties, self.settled);
        Ok(())
    }
}

fn set_runtime_state(properties: &mut TriggerProperties, state: RuntimeState) {
    match properties {
        TriggerProperties::ScheduleTrigger(props) => props.runtime_state = Some(state),
        TriggerProperties::TumblingWindowTrigger(props)
        | TriggerProperties::BlobEventsTrigger(props)
        | TriggerProperties::CustomEventsTrigger(props) => props.runtime_state = Some(state),
    }
}

/// Lookup key; resource groups are case-insensitive on the remote side
fn storage_key(id: &TriggerIdentity) -> String {
    format!(
        "{}/{}/{}/{}",
        id.subscription_id,
        id.resource_group.to_lowercase(),
        id.factory_name,
        id.trigger_name
    )
}
