//! Wire model of trigger resources as the remote API returns them
//!
//! One endpoint hosts several trigger kinds. The kind is decoded once into
//! [`TriggerProperties`] so callers match on a variant instead of casting.

use crate::recurrence::{DayOfWeek, Frequency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind tag of a schedule trigger
pub const SCHEDULE_TRIGGER_KIND: &str = "ScheduleTrigger";

/// Reference type attached to every pipeline reference
pub const PIPELINE_REFERENCE_TYPE: &str = "PipelineReference";

/// Execution state of a trigger, independent of its definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeState {
    #[default]
    Stopped,
    Started,
    Starting,
    Stopping,
    Disabled,
}

impl RuntimeState {
    /// Started, or on its way there
    pub fn is_running(&self) -> bool {
        matches!(self, RuntimeState::Started | RuntimeState::Starting)
    }
}

/// One weekday occurrence inside a month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceScheduleOccurrence {
    pub day: DayOfWeek,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<i32>,
}

/// Remote schedule block; unset fields are omitted on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecurrenceSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_days: Option<Vec<DayOfWeek>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_days: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_occurrences: Option<Vec<RecurrenceScheduleOccurrence>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTriggerRecurrence {
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<RemoteRecurrenceSchedule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReference {
    pub reference_name: String,
    #[serde(rename = "type")]
    pub reference_type: String,
}

impl PipelineReference {
    pub fn new(reference_name: impl Into<String>) -> Self {
        Self {
            reference_name: reference_name.into(),
            reference_type: PIPELINE_REFERENCE_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPipelineReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_reference: Option<PipelineReference>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Properties of the schedule trigger kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTriggerProperties {
    /// Read-only; set by the remote system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_state: Option<RuntimeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<TriggerPipelineReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<ScheduleTriggerRecurrence>,
}

impl ScheduleTriggerProperties {
    pub fn runtime_state(&self) -> RuntimeState {
        self.runtime_state.unwrap_or_default()
    }

    /// Copy without the read-only runtime state, for definition comparison
    pub fn definition(&self) -> Self {
        Self {
            runtime_state: None,
            ..self.clone()
        }
    }
}

/// Properties of any trigger kind this crate does not manage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherTriggerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_state: Option<RuntimeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Kind-tagged trigger properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerProperties {
    ScheduleTrigger(ScheduleTriggerProperties),
    TumblingWindowTrigger(OtherTriggerProperties),
    BlobEventsTrigger(OtherTriggerProperties),
    CustomEventsTrigger(OtherTriggerProperties),
}

impl TriggerProperties {
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerProperties::ScheduleTrigger(_) => SCHEDULE_TRIGGER_KIND,
            TriggerProperties::TumblingWindowTrigger(_) => "TumblingWindowTrigger",
            TriggerProperties::BlobEventsTrigger(_) => "BlobEventsTrigger",
            TriggerProperties::CustomEventsTrigger(_) => "CustomEventsTrigger",
        }
    }

    pub fn as_schedule(&self) -> Option<&ScheduleTriggerProperties> {
        match self {
            TriggerProperties::ScheduleTrigger(props) => Some(props),
            _ => None,
        }
    }

    pub fn runtime_state(&self) -> RuntimeState {
        match self {
            TriggerProperties::ScheduleTrigger(props) => props.runtime_state(),
            TriggerProperties::TumblingWindowTrigger(props)
            | TriggerProperties::BlobEventsTrigger(props)
            | TriggerProperties::CustomEventsTrigger(props) => {
                props.runtime_state.unwrap_or_default()
            }
        }
    }
}

/// A trigger resource as returned by the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResource {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub properties: TriggerProperties,
}
