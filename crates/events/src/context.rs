//! Per-call deadline and cancellation.
//!
//! The plain contract methods block without bound. Every store, publisher and
//! republisher operation also has a `*_within` form taking an [`OpContext`],
//! so callers can bound how long they wait for the store lock or abandon a
//! call that has not started mutating anything yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::store::EventStoreError;

/// Shared flag a caller flips to abandon in-flight operations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Optional deadline + optional cancellation token for one operation.
///
/// `OpContext::default()` has neither, which gives the unbounded blocking
/// behaviour of the plain contract methods.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail if the operation should not proceed.
    ///
    /// Cancellation is reported ahead of an expired deadline.
    pub fn check(&self) -> Result<(), EventStoreError> {
        if self.is_cancelled() {
            return Err(EventStoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(EventStoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
