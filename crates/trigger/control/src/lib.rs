//! # Trigger Control
//!
//! Declarative reconciliation of remote schedule triggers.
//!
//! ## Overview
//!
//! Given a [`DesiredTrigger`](trigger_types::DesiredTrigger) and a remote
//! reachable only through get, create-or-update, start, stop and delete,
//! the [`ReconcileController`] issues the minimal set of calls that makes the
//! remote match, and the [`StateProjector`] reports remote state back in the
//! declarative form.
//!
//! ## Key Components
//!
//! - [`ReconcileController`]: create, update, delete, import and observe cycles
//! - [`StateProjector`]: read path producing an [`Observation`]
//! - [`codec`]: declarative schedule to remote schedule and back
//! - [`detect_drift`]: field-level comparison of desired and projected state
//! - [`RequestContext`]: actor, request ID and cancellation signal per call
//! - [`EventAggregator`]: broadcast of every remote state change
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trigger_client::InMemoryTriggerClient;
//! use trigger_control::{ControllerConfig, ReconcileController, RequestContext, SystemClock};
//! use trigger_types::{DesiredTrigger, FactorySelector, Frequency, PipelineTarget, Recurrence};
//!
//! # async fn example() -> trigger_control::Result<()> {
//! let controller = ReconcileController::new(
//!     Arc::new(InMemoryTriggerClient::new()),
//!     Arc::new(SystemClock),
//!     ControllerConfig::default(),
//! );
//!
//! let desired = DesiredTrigger::new(
//!     "nightly",
//!     FactorySelector::Name {
//!         resource_group: "analytics".into(),
//!         factory_name: "warehouse".into(),
//!     },
//!     PipelineTarget::new("load"),
//! )
//! .with_recurrence(Recurrence::every(1, Frequency::Day))
//! .activated(true);
//!
//! let ctx = RequestContext::user("operator");
//! let identity = controller.create(&desired, "subscription", &ctx).await?;
//! let state = controller.read(&identity, &ctx).await?;
//! # let _ = state;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod clock;
pub mod codec;
pub mod config;
pub mod context;
pub mod controller;
pub mod deadline;
pub mod drift;
pub mod error;
pub mod events;
pub mod locks;
pub mod operations;
pub mod projector;
pub mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ControllerConfig, LoggingConfig, TimeoutConfig};
pub use context::{Actor, RequestContext};
pub use controller::{ReconcileController, TriggerPhase};
pub use deadline::Deadline;
pub use drift::{detect_drift, DriftReport};
pub use error::{ReconcileError, Result};
pub use events::{EventAggregator, EventSeverity, TriggerEvent, TriggerEventEnvelope};
pub use locks::{IdentityGuard, IdentityLocks};
pub use operations::{OperationCategory, ReconcileOperation};
pub use projector::{format_timestamp, projection_from_resource, Observation, Projection, StateProjector};
pub use telemetry::init_tracing;
