//! Event publishing/subscription contracts.
//!
//! Publication is **synchronous**: a store that implements [`EventPublisher`]
//! invokes every registered callback in-line, once per appended event, before
//! `store_events` returns. There is no queue and no retry.
//!
//! ```text
//! store_events ─┬─ append to history
//!               └─ for each appended event:
//!                     for each subscriber (registration order): callback(&event)
//! ```
//!
//! Callbacks run while the store holds its exclusive lock. A callback must not
//! call back into the same store, and a slow callback stalls every other
//! store operation until it returns.

use std::sync::Arc;

use evkernel_core::{Event, SubscriptionId};

use crate::context::OpContext;
use crate::store::EventStoreError;

/// Callback invoked on behalf of a subscriber for each published event.
pub type EventCallback<P> = Arc<dyn Fn(&Event<P>) + Send + Sync>;

/// Subscribe/unsubscribe to events as they are stored.
pub trait EventPublisher<P>: Send + Sync {
    /// Register `callback` for every future successful append and republish.
    ///
    /// Registration order determines fan-out order among subscribers.
    fn subscribe_events_within(
        &self,
        ctx: &OpContext,
        callback: EventCallback<P>,
    ) -> Result<SubscriptionId, EventStoreError>;

    /// Remove a registration. Unknown ids are a no-op.
    fn unsubscribe_within(&self, ctx: &OpContext, id: SubscriptionId) -> Result<(), EventStoreError>;

    fn subscribe_events(&self, callback: EventCallback<P>) -> Result<SubscriptionId, EventStoreError> {
        self.subscribe_events_within(&OpContext::default(), callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), EventStoreError> {
        self.unsubscribe_within(&OpContext::default(), id)
    }
}

/// Replay the entire store's history to current subscribers.
///
/// Used to rebuild downstream projections from scratch. Within one aggregate
/// events are delivered in version order; order across aggregates is
/// unspecified.
pub trait EventRepublisher: Send + Sync {
    /// Returns the number of events that were republished.
    fn republish_all_events_within(&self, ctx: &OpContext) -> Result<usize, EventStoreError>;

    fn republish_all_events(&self) -> Result<usize, EventStoreError> {
        self.republish_all_events_within(&OpContext::default())
    }
}

impl<P, B> EventPublisher<P> for Arc<B>
where
    B: EventPublisher<P> + ?Sized,
{
    fn subscribe_events_within(
        &self,
        ctx: &OpContext,
        callback: EventCallback<P>,
    ) -> Result<SubscriptionId, EventStoreError> {
        (**self).subscribe_events_within(ctx, callback)
    }

    fn unsubscribe_within(&self, ctx: &OpContext, id: SubscriptionId) -> Result<(), EventStoreError> {
        (**self).unsubscribe_within(ctx, id)
    }
}

impl<B> EventRepublisher for Arc<B>
where
    B: EventRepublisher + ?Sized,
{
    fn republish_all_events_within(&self, ctx: &OpContext) -> Result<usize, EventStoreError> {
        (**self).republish_all_events_within(ctx)
    }
}
