//! Deadline and cancellation guard for remote steps
//!
//! One deadline is computed per public call. Every remote step of that call
//! runs under it and under the request's cancellation token; whichever fires
//! first ends the step with a timeout.

use crate::context::RequestContext;
use crate::error::{ReconcileError, Result};
use crate::operations::ReconcileOperation;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use trigger_types::TriggerIdentity;

/// Stand-in for budgets too large to add to the monotonic clock
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Shared deadline of one public controller call
#[derive(Debug, Clone)]
pub struct Deadline {
    identity: TriggerIdentity,
    at: Instant,
    cancellation: CancellationToken,
}

impl Deadline {
    /// Start the clock for `identity` with the given budget
    pub fn start(identity: &TriggerIdentity, budget: Duration, ctx: &RequestContext) -> Self {
        let now = Instant::now();
        Self {
            identity: identity.clone(),
            at: now
                .checked_add(budget)
                .unwrap_or_else(|| now + FAR_FUTURE),
            cancellation: ctx.cancellation.clone(),
        }
    }

    /// Run one remote step under the deadline
    pub async fn guard<F, T>(&self, operation: ReconcileOperation, step: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(self.timeout(operation)),
            outcome = tokio::time::timeout_at(self.at, step) => {
                outcome.map_err(|_| self.timeout(operation))
            }
        }
    }

    fn timeout(&self, operation: ReconcileOperation) -> ReconcileError {
        ReconcileError::Timeout {
            identity: self.identity.clone(),
            operation,
        }
    }
}
