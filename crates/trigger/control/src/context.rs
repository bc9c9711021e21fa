//! Request context for reconciliation calls
//!
//! The request context carries who asked for a reconciliation, a request ID
//! for tracing, and the cancellation signal that aborts remote waits.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context for a reconciliation request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID for tracing
    pub request_id: Uuid,
    /// Actor making the request
    pub actor: Actor,
    /// Request timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Optional correlation ID for distributed tracing
    pub correlation_id: Option<String>,
    /// Cancelling this token aborts the current remote wait
    pub cancellation: CancellationToken,
}

/// Actor making a reconciliation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Actor {
    /// Human operator
    User {
        /// User identifier
        user_id: String,
    },
    /// Service account
    Service {
        /// Service identifier
        service_id: String,
    },
    /// Internal system operation, e.g. a periodic drift check
    System {
        /// Component name
        component: String,
    },
}

impl RequestContext {
    /// Create a new request context
    pub fn new(actor: Actor) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor,
            timestamp: chrono::Utc::now(),
            correlation_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Set a correlation ID for distributed tracing
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Tie this request to an outer cancellation signal
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Create a system context for internal operations
    pub fn system(component: impl Into<String>) -> Self {
        Self::new(Actor::System {
            component: component.into(),
        })
    }

    /// Create a user context
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::new(Actor::User {
            user_id: user_id.into(),
        })
    }

    /// Create a service context
    pub fn service(service_id: impl Into<String>) -> Self {
        Self::new(Actor::Service {
            service_id: service_id.into(),
        })
    }

    /// Abort any remote wait running under this context
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Get the actor's identity string
    pub fn actor_id(&self) -> String {
        match &self.actor {
            Actor::User { user_id } => format!("user:{}", user_id),
            Actor::Service { service_id } => format!("service:{}", service_id),
            Actor::System { component } => format!("system:{}", component),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::system("default")
    }
}
