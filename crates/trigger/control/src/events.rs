//! Reconciliation events
//!
//! The EventAggregator broadcasts every remote state change the controller
//! makes, for monitoring and audit.

use crate::context::RequestContext;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use trigger_types::TriggerIdentity;
use uuid::Uuid;

/// Channel capacity for the event stream
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

/// Remote state changes made by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TriggerEvent {
    /// The definition was written with create-or-update
    DefinitionApplied {
        identity: TriggerIdentity,
        created: bool,
    },
    Started {
        identity: TriggerIdentity,
    },
    Stopped {
        identity: TriggerIdentity,
    },
    Deleted {
        identity: TriggerIdentity,
    },
    /// A read found remote state differing from desired state
    DriftDetected {
        identity: TriggerIdentity,
        fields: Vec<String>,
    },
    /// A cycle stopped on an error
    ReconcileFailed {
        identity: TriggerIdentity,
        reason: String,
    },
}

impl TriggerEvent {
    pub fn identity(&self) -> &TriggerIdentity {
        match self {
            Self::DefinitionApplied { identity, .. }
            | Self::Started { identity }
            | Self::Stopped { identity }
            | Self::Deleted { identity }
            | Self::DriftDetected { identity, .. }
            | Self::ReconcileFailed { identity, .. } => identity,
        }
    }
}

/// Envelope wrapping every event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub severity: EventSeverity,
    /// Request that caused the event
    pub request_id: Uuid,
    /// Correlation ID for tracing
    pub correlation_id: Option<String>,
    /// Actor who triggered the event
    pub actor: String,
    /// The actual event
    pub event: TriggerEvent,
}

/// Broadcasts controller events to any number of subscribers
#[derive(Clone)]
pub struct EventAggregator {
    tx: broadcast::Sender<TriggerEventEnvelope>,
}

impl EventAggregator {
    /// Create a new event aggregator
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEventEnvelope> {
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Emit an event on behalf of a request
    pub fn emit(&self, event: TriggerEvent, severity: EventSeverity, ctx: &RequestContext) {
        let envelope = TriggerEventEnvelope {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            severity,
            request_id: ctx.request_id,
            correlation_id: ctx.correlation_id.clone(),
            actor: ctx.actor_id(),
            event,
        };
        // No subscribers is fine
        let _ = self.tx.send(envelope);
    }

    /// Emit an info-level event
    pub fn emit_info(&self, event: TriggerEvent, ctx: &RequestContext) {
        self.emit(event, EventSeverity::Info, ctx);
    }

    /// Emit a warning-level event
    pub fn emit_warning(&self, event: TriggerEvent, ctx: &RequestContext) {
        self.emit(event, EventSeverity::Warning, ctx);
    }

    /// Emit an error-level event
    pub fn emit_error(&self, event: TriggerEvent, ctx: &RequestContext) {
        self.emit(event, EventSeverity::Error, ctx);
    }
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new()
    }
}
