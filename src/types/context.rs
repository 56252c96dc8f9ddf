//! Execution context threaded through every core call
//!
//! Carries the correlation id stamped on transaction records and log lines,
//! and the cancellation token that interrupts lock waits.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::Span;
use uuid::Uuid;

/// Per-operation context
///
/// Cloning keeps the correlation id and shares the cancellation token.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    correlation_id: Uuid,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Create a context with a fresh correlation id
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create a context whose lock waits are interrupted by `cancellation`
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        ExecutionContext {
            correlation_id: Uuid::new_v4(),
            cancellation,
        }
    }

    /// Derive a context for a sub-operation
    ///
    /// The child gets its own correlation id and is cancelled together with
    /// its parent.
    pub fn child(&self) -> Self {
        ExecutionContext {
            correlation_id: Uuid::new_v4(),
            cancellation: self.cancellation.child_token(),
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Future resolving once the context is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    /// Tracing span for an operation run under this context
    pub fn span(&self, operation: &'static str) -> Span {
        tracing::info_span!("ledger", op = operation, correlation_id = %self.correlation_id)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_has_new_correlation_id_and_shares_cancellation() {
        let parent = ExecutionContext::new();
        let child = parent.child();

        assert_ne!(parent.correlation_id(), child.correlation_id());
        assert!(!child.is_cancelled());

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_cancelling_child_leaves_parent_running() {
        let parent = ExecutionContext::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
