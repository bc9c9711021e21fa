//! Trigger Types - Core types for schedule trigger reconciliation
//!
//! A schedule trigger fires a data factory pipeline according to a
//! recurrence rule. This crate holds the two views of such a trigger:
//!
//! - **Declarative**: [`DesiredTrigger`], the flat configuration a caller owns
//! - **Remote**: [`TriggerResource`], the nested object the remote API stores
//!
//! ## Key Concepts
//!
//! - **TriggerIdentity**: Composite path of subscription, group, factory and name
//! - **FactorySelector**: The two accepted ways of naming the owning factory
//! - **Recurrence**: Frequency/interval rule with an optional schedule block
//! - **TriggerProperties**: Kind-tagged remote payload; only schedule triggers are managed

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod desired;
pub mod ids;
pub mod recurrence;
pub mod remote;
pub mod validation;

// Re-export main types
pub use desired::{DesiredTrigger, PipelineTarget};
pub use ids::{FactoryId, FactorySelector, IdentityParseError, TriggerIdentity};
pub use recurrence::{DayOfWeek, Frequency, MonthlyOccurrence, Recurrence, RecurrenceSchedule};
pub use remote::{
    OtherTriggerProperties, PipelineReference, RecurrenceScheduleOccurrence,
    RemoteRecurrenceSchedule, RuntimeState, ScheduleTriggerProperties,
    ScheduleTriggerRecurrence, TriggerPipelineReference, TriggerProperties, TriggerResource,
    PIPELINE_REFERENCE_TYPE, SCHEDULE_TRIGGER_KIND,
};
pub use validation::{ValidationError, ValidationErrors, MAX_HOUR, MAX_MINUTE};
