use std::sync::Arc;

use thiserror::Error;

use evkernel_core::{Aggregate, AggregateId, DomainError, Event};

use crate::context::OpContext;

/// Event store operation error.
///
/// Every failure is a distinct variant so callers can branch on it; none of
/// them is ever reported as a successful empty result, and none is retried
/// inside the store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stored version was not strictly below the submitted one.
    #[error(
        "optimistic concurrency check failed for {aggregate_id}: stored version {stored}, submitted {submitted}"
    )]
    Concurrency {
        aggregate_id: AggregateId,
        stored: u64,
        submitted: u64,
    },

    #[error("no events stored for aggregate {0}")]
    NotFound(AggregateId),

    #[error("storage failure: {0}")]
    Storage(String),

    /// Only identifier generation failures belong here; other domain errors
    /// are never converted into store errors.
    #[error("subscription id generation failed: {0}")]
    IdGeneration(DomainError),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("operation cancelled")]
    Cancelled,
}

/// Append-only, versioned event store.
///
/// Events are grouped per aggregate id into a history that is only ever
/// extended. Each history remembers the last committed version.
///
/// ## Append Semantics
///
/// `store_events` appends `aggregate.uncommitted()` **iff** the recorded
/// version for `aggregate.id()` is strictly less than `aggregate.version()`
/// (an unknown id counts as version 0). Otherwise it fails with
/// [`EventStoreError::Concurrency`] and appends nothing. On success the
/// recorded version becomes `aggregate.version()`.
///
/// Stores that also implement [`EventPublisher`](crate::EventPublisher)
/// deliver every appended event to current subscribers before returning.
///
/// ## Load Semantics
///
/// `retrieve_events` returns the full committed history in stored order, or
/// [`EventStoreError::NotFound`] when nothing was ever stored for the id.
pub trait EventStore<P>: Send + Sync {
    /// Append an aggregate's uncommitted events under optimistic concurrency.
    fn store_events_within(&self, ctx: &OpContext, aggregate: &Aggregate<P>) -> Result<(), EventStoreError>;

    /// Load the full committed history for `id`.
    fn retrieve_events_within(&self, ctx: &OpContext, id: AggregateId) -> Result<Vec<Event<P>>, EventStoreError>;

    fn store_events(&self, aggregate: &Aggregate<P>) -> Result<(), EventStoreError> {
        self.store_events_within(&OpContext::default(), aggregate)
    }

    fn retrieve_events(&self, id: AggregateId) -> Result<Vec<Event<P>>, EventStoreError> {
        self.retrieve_events_within(&OpContext::default(), id)
    }
}

impl<P, S> EventStore<P> for Arc<S>
where
    S: EventStore<P> + ?Sized,
{
    fn store_events_within(&self, ctx: &OpContext, aggregate: &Aggregate<P>) -> Result<(), EventStoreError> {
        (**self).store_events_within(ctx, aggregate)
    }

    fn retrieve_events_within(&self, ctx: &OpContext, id: AggregateId) -> Result<Vec<Event<P>>, EventStoreError> {
        (**self).retrieve_events_within(ctx, id)
    }
}
