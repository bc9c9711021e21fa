//! ReconcileController: converges a remote schedule trigger on desired state
//!
//! Every public call is one reconciliation cycle: a sequential pipeline of
//! remote calls, each a precondition for the next. Cycles for one identity
//! are serialised; cycles for distinct identities run independently.

use crate::clock::Clock;
use crate::codec;
use crate::config::ControllerConfig;
use crate::context::RequestContext;
use crate::deadline::Deadline;
use crate::drift::{detect_drift, DriftReport};
use crate::error::{ReconcileError, Result};
use crate::events::{EventAggregator, TriggerEvent, TriggerEventEnvelope};
use crate::locks::{IdentityGuard, IdentityLocks};
use crate::operations::{OperationCategory, ReconcileOperation};
use crate::projector::{Observation, Projection, StateProjector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use trigger_client::{ClientResult, RemoteTriggerClient};
use trigger_types::{
    DesiredTrigger, IdentityParseError, PipelineReference, ScheduleTriggerProperties,
    TriggerIdentity, TriggerPipelineReference, TriggerProperties, TriggerResource,
    SCHEDULE_TRIGGER_KIND,
};

/// Where a trigger stands relative to its desired state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TriggerPhase {
    /// Nothing exists remotely
    Absent,
    /// The trigger exists but differs from desired state
    DefinitionOnly { drift: DriftReport },
    /// Definition and activation both match
    Converged { activated: bool },
}

/// Declarative controller for schedule triggers
pub struct ReconcileController {
    client: Arc<dyn RemoteTriggerClient>,
    clock: Arc<dyn Clock>,
    config: ControllerConfig,
    projector: StateProjector,
    locks: IdentityLocks,
    events: Arc<EventAggregator>,
}

impl ReconcileController {
    pub fn new(
        client: Arc<dyn RemoteTriggerClient>,
        clock: Arc<dyn Clock>,
        config: ControllerConfig,
    ) -> Self {
        let projector = StateProjector::new(client.clone(), config.timeouts.clone());
        Self {
            client,
            clock,
            config,
            projector,
            locks: IdentityLocks::new(),
            events: Arc::new(EventAggregator::new()),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Subscribe to remote state changes made by this controller
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEventEnvelope> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &Arc<EventAggregator> {
        &self.events
    }

    // ========== Create ==========

    /// Create a trigger that must not exist yet
    ///
    /// An existing trigger under the same identity aborts the cycle with
    /// [`ReconcileError::AlreadyExists`]; it has to be imported instead.
    /// The returned identity has to be read back to materialise state.
    #[instrument(skip(self, desired, ctx), fields(trigger = %desired.name, request_id = %ctx.request_id))]
    pub async fn create(
        &self,
        desired: &DesiredTrigger,
        subscription_id: &str,
        ctx: &RequestContext,
    ) -> Result<TriggerIdentity> {
        let result = self.create_cycle(desired, subscription_id, ctx).await;
        self.report(result, ctx)
    }

    /// Create under the subscription named in the configuration
    pub async fn create_in_default_subscription(
        &self,
        desired: &DesiredTrigger,
        ctx: &RequestContext,
    ) -> Result<TriggerIdentity> {
        let subscription_id = self
            .config
            .subscription_id
            .as_deref()
            .ok_or(IdentityParseError::EmptyComponent("subscription_id"))?;
        self.create(desired, subscription_id, ctx).await
    }

    async fn create_cycle(
        &self,
        desired: &DesiredTrigger,
        subscription_id: &str,
        ctx: &RequestContext,
    ) -> Result<TriggerIdentity> {
        let identity = desired.factory.resolve(subscription_id, &desired.name);
        identity.ensure_complete()?;

        let deadline = self.deadline(&identity, OperationCategory::Create, ctx);
        let _guard = self.lock(&identity, &deadline).await?;

        let existing = deadline
            .guard(ReconcileOperation::ExistenceCheck, self.client.get(&identity))
            .await?;
        if self.swallow_not_found(&identity, existing)?.is_some() {
            return Err(ReconcileError::AlreadyExists {
                id: identity.address_path(),
            });
        }

        let payload = self.build_payload(desired, None);
        self.apply_definition(&identity, payload, &deadline).await?;
        self.events.emit_info(
            TriggerEvent::DefinitionApplied {
                identity: identity.clone(),
                created: true,
            },
            ctx,
        );
        info!(trigger = %identity, "Trigger definition created");

        if desired.activated {
            self.start_trigger(&identity, &deadline, ctx).await?;
        }

        Ok(identity)
    }

    // ========== Update ==========

    /// Converge an existing trigger on `desired`
    ///
    /// The definition is only rewritten when it differs from the remote one.
    /// Activation changes are applied with start or stop; update never
    /// deletes.
    #[instrument(skip(self, desired, ctx), fields(trigger = %identity, request_id = %ctx.request_id))]
    pub async fn update(
        &self,
        identity: &TriggerIdentity,
        desired: &DesiredTrigger,
        ctx: &RequestContext,
    ) -> Result<TriggerIdentity> {
        let result = self.update_cycle(identity, desired, ctx).await;
        self.report(result, ctx)
    }

    async fn update_cycle(
        &self,
        identity: &TriggerIdentity,
        desired: &DesiredTrigger,
        ctx: &RequestContext,
    ) -> Result<TriggerIdentity> {
        identity.ensure_complete()?;

        let deadline = self.deadline(identity, OperationCategory::Update, ctx);
        let _guard = self.lock(identity, &deadline).await?;

        let fetched = deadline
            .guard(ReconcileOperation::Read, self.client.get(identity))
            .await?;
        let resource = self
            .swallow_not_found(identity, fetched)?
            .ok_or_else(|| ReconcileError::NotFound {
                identity: identity.clone(),
            })?;
        let current = schedule_properties(identity, &resource)?;

        let remote_start = current.recurrence.as_ref().and_then(|r| r.start_time);
        let payload = self.build_payload(desired, remote_start);

        if payload.definition() != current.definition() {
            self.apply_definition(identity, payload, &deadline).await?;
            self.events.emit_info(
                TriggerEvent::DefinitionApplied {
                    identity: identity.clone(),
                    created: false,
                },
                ctx,
            );
            info!("Trigger definition updated");
        } else {
            debug!("Trigger definition unchanged");
        }

        let running = current.runtime_state().is_running();
        match (desired.activated, running) {
            (true, false) => self.start_trigger(identity, &deadline, ctx).await?,
            (false, true) => self.stop_trigger(identity, &deadline, ctx).await?,
            _ => debug!(running, "Activation unchanged"),
        }

        Ok(identity.clone())
    }

    // ========== Delete ==========

    /// Stop, then delete
    ///
    /// Stop is always issued, even for a stopped trigger, and a failed or
    /// timed-out stop leaves the trigger in place.
    #[instrument(skip(self, ctx), fields(trigger = %identity, request_id = %ctx.request_id))]
    pub async fn delete(&self, identity: &TriggerIdentity, ctx: &RequestContext) -> Result<()> {
        let result = self.delete_cycle(identity, ctx).await;
        self.report(result, ctx)
    }

    async fn delete_cycle(&self, identity: &TriggerIdentity, ctx: &RequestContext) -> Result<()> {
        identity.ensure_complete()?;

        let deadline = self.deadline(identity, OperationCategory::Delete, ctx);
        let _guard = self.lock(identity, &deadline).await?;

        self.stop_trigger(identity, &deadline, ctx).await?;

        deadline
            .guard(ReconcileOperation::Delete, self.client.delete(identity))
            .await?
            .map_err(|source| ReconcileError::DeleteFailed {
                identity: identity.clone(),
                source,
            })?;

        self.events.emit_info(
            TriggerEvent::Deleted {
                identity: identity.clone(),
            },
            ctx,
        );
        info!("Trigger deleted");
        Ok(())
    }

    // ========== Read ==========

    /// Project the remote trigger into declarative form
    pub async fn read(&self, identity: &TriggerIdentity, ctx: &RequestContext) -> Result<Observation> {
        let deadline = self.deadline(identity, OperationCategory::Read, ctx);
        let _guard = self.lock(identity, &deadline).await?;
        self.projector.project_within(identity, &deadline).await
    }

    /// Adopt an existing trigger by its address path
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn import(&self, address_path: &str, ctx: &RequestContext) -> Result<Projection> {
        let identity: TriggerIdentity = address_path.parse()?;

        let deadline = self.deadline(&identity, OperationCategory::Read, ctx);
        let _guard = self.lock(&identity, &deadline).await?;

        match self.projector.project_within(&identity, &deadline).await? {
            Observation::Present(projection) => {
                info!(trigger = %identity, "Trigger imported");
                Ok(projection)
            }
            Observation::Absent => Err(ReconcileError::NotFound { identity }),
        }
    }

    /// Read the trigger and compare it with `desired`
    #[instrument(skip(self, desired, ctx), fields(trigger = %identity, request_id = %ctx.request_id))]
    pub async fn observe(
        &self,
        identity: &TriggerIdentity,
        desired: &DesiredTrigger,
        ctx: &RequestContext,
    ) -> Result<TriggerPhase> {
        let projection = match self.read(identity, ctx).await? {
            Observation::Absent => return Ok(TriggerPhase::Absent),
            Observation::Present(projection) => projection,
        };

        let drift = detect_drift(desired, identity, &projection);
        if drift.is_empty() {
            return Ok(TriggerPhase::Converged {
                activated: projection.activated,
            });
        }

        warn!(fields = ?drift.fields, "Trigger drifted from desired state");
        self.events.emit_warning(
            TriggerEvent::DriftDetected {
                identity: identity.clone(),
                fields: drift.fields.clone(),
            },
            ctx,
        );
        Ok(TriggerPhase::DefinitionOnly { drift })
    }

    // ========== Payload ==========

    /// Remote definition for `desired`
    ///
    /// Without a desired start time, `fallback_start` is used, then the clock.
    /// Annotations are omitted when there are none.
    pub fn build_payload(
        &self,
        desired: &DesiredTrigger,
        fallback_start: Option<DateTime<Utc>>,
    ) -> ScheduleTriggerProperties {
        let mut recurrence = desired.recurrence.clone();
        if recurrence.start_time.is_none() {
            recurrence.start_time = fallback_start;
        }

        ScheduleTriggerProperties {
            runtime_state: None,
            description: desired.description.clone(),
            annotations: (!desired.annotations.is_empty()).then(|| desired.annotations.clone()),
            pipelines: Some(vec![TriggerPipelineReference {
                pipeline_reference: Some(PipelineReference::new(desired.pipeline.name.clone())),
                parameters: desired.pipeline.parameters.clone(),
            }]),
            recurrence: Some(codec::encode_recurrence(&recurrence, self.clock.now())),
        }
    }

    // ========== Steps ==========

    fn deadline(
        &self,
        identity: &TriggerIdentity,
        category: OperationCategory,
        ctx: &RequestContext,
    ) -> Deadline {
        Deadline::start(identity, self.config.timeouts.budget(category), ctx)
    }

    /// Wait for exclusive access to `identity`, bounded by the call's deadline
    async fn lock(
        &self,
        identity: &TriggerIdentity,
        deadline: &Deadline,
    ) -> Result<IdentityGuard> {
        deadline
            .guard(ReconcileOperation::LockWait, self.locks.acquire(identity))
            .await
    }

    /// A not-found answer to an existence check is an absent trigger
    fn swallow_not_found(
        &self,
        identity: &TriggerIdentity,
        fetched: ClientResult<Option<TriggerResource>>,
    ) -> Result<Option<TriggerResource>> {
        match fetched {
            Ok(resource) => Ok(resource),
            Err(err) if err.is_not_found() => {
                debug!(trigger = %identity, "Trigger not found");
                Ok(None)
            }
            Err(source) => Err(ReconcileError::ReadFailed {
                identity: identity.clone(),
                source,
            }),
        }
    }

    async fn apply_definition(
        &self,
        identity: &TriggerIdentity,
        payload: ScheduleTriggerProperties,
        deadline: &Deadline,
    ) -> Result<()> {
        deadline
            .guard(
                ReconcileOperation::CreateOrUpdate,
                self.client
                    .create_or_update(identity, TriggerProperties::ScheduleTrigger(payload)),
            )
            .await?
            .map_err(|source| ReconcileError::UpdateFailed {
                identity: identity.clone(),
                source,
            })?;
        Ok(())
    }

    async fn start_trigger(
        &self,
        identity: &TriggerIdentity,
        deadline: &Deadline,
        ctx: &RequestContext,
    ) -> Result<()> {
        let start_failed = |source| ReconcileError::StartFailed {
            identity: identity.clone(),
            source,
        };

        let operation = deadline
            .guard(ReconcileOperation::Start, self.client.start(identity))
            .await?
            .map_err(start_failed)?;
        deadline
            .guard(ReconcileOperation::Start, operation.wait())
            .await?
            .map_err(start_failed)?;

        self.events.emit_info(
            TriggerEvent::Started {
                identity: identity.clone(),
            },
            ctx,
        );
        info!(trigger = %identity, "Trigger started");
        Ok(())
    }

    async fn stop_trigger(
        &self,
        identity: &TriggerIdentity,
        deadline: &Deadline,
        ctx: &RequestContext,
    ) -> Result<()> {
        let stop_failed = |source| ReconcileError::StopFailed {
            identity: identity.clone(),
            source,
        };

        let operation = deadline
            .guard(ReconcileOperation::Stop, self.client.stop(identity))
            .await?
            .map_err(stop_failed)?;
        deadline
            .guard(ReconcileOperation::Stop, operation.wait())
            .await?
            .map_err(stop_failed)?;

        self.events.emit_info(
            TriggerEvent::Stopped {
                identity: identity.clone(),
            },
            ctx,
        );
        info!(trigger = %identity, "Trigger stopped");
        Ok(())
    }

    fn report<T>(&self, result: Result<T>, ctx: &RequestContext) -> Result<T> {
        if let Err(err) = &result {
            warn!(error = %err, retryable = err.is_retryable(), "Reconciliation failed");
            if let Some(identity) = err.identity() {
                self.events.emit_error(
                    TriggerEvent::ReconcileFailed {
                        identity: identity.clone(),
                        reason: err.to_string(),
                    },
                    ctx,
                );
            }
        }
        result
    }
}

fn schedule_properties<'a>(
    identity: &TriggerIdentity,
    resource: &'a TriggerResource,
) -> Result<&'a ScheduleTriggerProperties> {
    resource
        .properties
        .as_schedule()
        .ok_or_else(|| ReconcileError::Classification {
            identity: identity.clone(),
            expected: SCHEDULE_TRIGGER_KIND,
            actual: resource.properties.kind().to_string(),
        })
}
