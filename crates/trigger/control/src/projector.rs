//! Read path: remote trigger back into the declarative representation

use crate::codec;
use crate::config::TimeoutConfig;
use crate::context::RequestContext;
use crate::deadline::Deadline;
use crate::error::{ReconcileError, Result};
use crate::operations::{OperationCategory, ReconcileOperation};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use trigger_client::RemoteTriggerClient;
use trigger_types::{
    Frequency, RecurrenceSchedule, RuntimeState, TriggerIdentity, TriggerResource,
    SCHEDULE_TRIGGER_KIND,
};

/// Result of reading one trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    /// The remote has no such trigger; drop any cached identity
    Absent,
    Present(Projection),
}

impl Observation {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn into_projection(self) -> Option<Projection> {
        match self {
            Self::Absent => None,
            Self::Present(projection) => Some(projection),
        }
    }
}

/// Remote state of a schedule trigger in declarative form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Identity as the caller knows it
    pub identity: TriggerIdentity,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub interval: u32,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub start_time: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub end_time: Option<String>,
    pub schedule: RecurrenceSchedule,
    pub pipeline_name: Option<String>,
    pub pipeline_parameters: BTreeMap<String, String>,
    pub annotations: Vec<String>,
    pub activated: bool,
    pub runtime_state: RuntimeState,
}

/// Fixed textual form used for projected timestamps
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Project a fetched resource
///
/// Fails with a classification error when the resource is not a schedule
/// trigger. When the remote echoes the resource group in a different case,
/// the caller's identity is kept.
pub fn projection_from_resource(
    identity: &TriggerIdentity,
    resource: &TriggerResource,
) -> Result<Projection> {
    let props =
        resource
            .properties
            .as_schedule()
            .ok_or_else(|| ReconcileError::Classification {
                identity: identity.clone(),
                expected: SCHEDULE_TRIGGER_KIND,
                actual: resource.properties.kind().to_string(),
            })?;

    let reported = resource
        .id
        .parse::<TriggerIdentity>()
        .ok()
        .filter(|echoed| !echoed.matches_ignoring_group_case(identity))
        .unwrap_or_else(|| identity.clone());

    let recurrence = props.recurrence.as_ref();
    let first_pipeline = props.pipelines.as_ref().and_then(|p| p.first());
    let runtime_state = props.runtime_state();

    Ok(Projection {
        identity: reported,
        description: props.description.clone(),
        frequency: recurrence.map(|r| r.frequency).unwrap_or_default(),
        interval: recurrence.and_then(|r| r.interval).unwrap_or(1),
        start_time: recurrence
            .and_then(|r| r.start_time.as_ref())
            .map(format_timestamp),
        end_time: recurrence
            .and_then(|r| r.end_time.as_ref())
            .map(format_timestamp),
        schedule: codec::decode(recurrence.and_then(|r| r.schedule.as_ref())),
        pipeline_name: first_pipeline
            .and_then(|p| p.pipeline_reference.as_ref())
            .map(|r| r.reference_name.clone()),
        pipeline_parameters: first_pipeline
            .map(|p| p.parameters.clone())
            .unwrap_or_default(),
        annotations: props.annotations.clone().unwrap_or_default(),
        activated: runtime_state == RuntimeState::Started,
        runtime_state,
    })
}

/// Reads triggers and projects them
#[derive(Clone)]
pub struct StateProjector {
    client: Arc<dyn RemoteTriggerClient>,
    timeouts: TimeoutConfig,
}

impl StateProjector {
    pub fn new(client: Arc<dyn RemoteTriggerClient>, timeouts: TimeoutConfig) -> Self {
        Self { client, timeouts }
    }

    /// Read `identity` under the read budget
    #[instrument(skip(self, ctx), fields(trigger = %identity, request_id = %ctx.request_id))]
    pub async fn project(
        &self,
        identity: &TriggerIdentity,
        ctx: &RequestContext,
    ) -> Result<Observation> {
        let deadline = Deadline::start(
            identity,
            self.timeouts.budget(OperationCategory::Read),
            ctx,
        );
        self.project_within(identity, &deadline).await
    }

    /// Read `identity` under a deadline the caller already holds
    pub(crate) async fn project_within(
        &self,
        identity: &TriggerIdentity,
        deadline: &Deadline,
    ) -> Result<Observation> {
        let fetched = deadline
            .guard(ReconcileOperation::Read, self.client.get(identity))
            .await?
            .map_err(|source| ReconcileError::ReadFailed {
                identity: identity.clone(),
                source,
            })?;

        match fetched {
            None => {
                debug!("Trigger not found, reporting absent");
                Ok(Observation::Absent)
            }
            Some(resource) => Ok(Observation::Present(projection_from_resource(
                identity, &resource,
            )?)),
        }
    }
}
