use std::collections::HashMap;
use std::time::Instant;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use evkernel_core::{Aggregate, AggregateId, Event, SubscriptionId};
use evkernel_events::{
    EventCallback, EventPublisher, EventRepublisher, EventStore, EventStoreError, OpContext,
    SubscriberRegistry,
};

use crate::config::StoreConfig;

/// Committed history of one aggregate.
struct StreamRecord<P> {
    events: Vec<Event<P>>,
    current_version: u64,
}

impl<P> Default for StreamRecord<P> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            current_version: 0,
        }
    }
}

struct Inner<P> {
    streams: HashMap<AggregateId, StreamRecord<P>>,
    subscribers: SubscriberRegistry<P>,
}

/// In-memory append-only event store with synchronous publication.
///
/// Implements [`EventStore`], [`EventPublisher`] and [`EventRepublisher`] on
/// top of one reader/writer lock:
///
/// - `store_events`, `subscribe_events`, `unsubscribe` and
///   `republish_all_events` take the lock exclusively
/// - `retrieve_events` takes it shared
///
/// Subscriber callbacks run on the calling thread **while the exclusive lock
/// is held**. A callback that calls back into this store deadlocks, and a slow
/// one stalls every other caller.
///
/// Intended for tests/dev. Nothing is persisted.
pub struct InMemoryEventStore<P> {
    inner: RwLock<Inner<P>>,
    config: StoreConfig,
}

impl<P> InMemoryEventStore<P> {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                streams: HashMap::with_capacity(config.initial_capacity),
                subscribers: SubscriberRegistry::new(),
            }),
            config,
        }
    }

    /// Last committed version for `id`, if anything was stored for it.
    pub fn stored_version(&self, id: AggregateId) -> Option<u64> {
        self.inner.read().streams.get(&id).map(|s| s.current_version)
    }

    pub fn aggregate_count(&self) -> usize {
        self.inner.read().streams.len()
    }

    pub fn event_count(&self) -> usize {
        self.inner.read().streams.values().map(|s| s.events.len()).sum()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }

    fn lock_deadline(&self, ctx: &OpContext) -> Option<Instant> {
        ctx.deadline()
            .or_else(|| self.config.lock_timeout().map(|timeout| Instant::now() + timeout))
    }

    fn write(&self, ctx: &OpContext) -> Result<RwLockWriteGuard<'_, Inner<P>>, EventStoreError> {
        ctx.check()?;
        let guard = match self.lock_deadline(ctx) {
            Some(deadline) => self
                .inner
                .try_write_until(deadline)
                .ok_or(EventStoreError::DeadlineExceeded)?,
            None => self.inner.write(),
        };
        // Cancellation may have arrived while waiting for the lock.
        ctx.check()?;
        Ok(guard)
    }

    fn read(&self, ctx: &OpContext) -> Result<RwLockReadGuard<'_, Inner<P>>, EventStoreError> {
        ctx.check()?;
        let guard = match self.lock_deadline(ctx) {
            Some(deadline) => self
                .inner
                .try_read_until(deadline)
                .ok_or(EventStoreError::DeadlineExceeded)?,
            None => self.inner.read(),
        };
        ctx.check()?;
        Ok(guard)
    }
}

impl<P> Default for InMemoryEventStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> core::fmt::Debug for InMemoryEventStore<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("InMemoryEventStore")
            .field("aggregates", &inner.streams.len())
            .field("subscribers", &inner.subscribers)
            .field("config", &self.config)
            .finish()
    }
}

impl<P> EventStore<P> for InMemoryEventStore<P>
where
    P: Clone + Send + Sync,
{
    fn store_events_within(&self, ctx: &OpContext, aggregate: &Aggregate<P>) -> Result<(), EventStoreError> {
        let mut inner = self.write(ctx)?;
        let Inner { streams, subscribers } = &mut *inner;

        let aggregate_id = aggregate.id();
        let submitted = aggregate.version();
        let stored = streams.get(&aggregate_id).map_or(0, |s| s.current_version);

        // Has someone stored this aggregate at this version (or later) already?
        if stored >= submitted {
            tracing::warn!(%aggregate_id, stored, submitted, "optimistic concurrency conflict");
            return Err(EventStoreError::Concurrency {
                aggregate_id,
                stored,
                submitted,
            });
        }

        // Commit fully before fan-out: a panicking callback must not leave the
        // recorded version ahead of the history.
        let stream = streams.entry(aggregate_id).or_default();
        let first_new = stream.events.len();
        stream.events.extend(aggregate.uncommitted().iter().cloned());
        stream.current_version = submitted;

        for event in &stream.events[first_new..] {
            subscribers.publish(event);
        }

        tracing::debug!(
            %aggregate_id,
            version = submitted,
            events = aggregate.uncommitted().len(),
            subscribers = subscribers.len(),
            "stored events"
        );

        Ok(())
    }

    fn retrieve_events_within(&self, ctx: &OpContext, id: AggregateId) -> Result<Vec<Event<P>>, EventStoreError> {
        let inner = self.read(ctx)?;
        let stream = inner.streams.get(&id).ok_or(EventStoreError::NotFound(id))?;

        tracing::debug!(aggregate_id = %id, events = stream.events.len(), "retrieved events");
        Ok(stream.events.clone())
    }
}

impl<P> EventPublisher<P> for InMemoryEventStore<P>
where
    P: Clone + Send + Sync,
{
    fn subscribe_events_within(
        &self,
        ctx: &OpContext,
        callback: EventCallback<P>,
    ) -> Result<SubscriptionId, EventStoreError> {
        let mut inner = self.write(ctx)?;
        let subscription_id = inner
            .subscribers
            .subscribe(callback)
            .map_err(EventStoreError::IdGeneration)?;

        tracing::debug!(%subscription_id, subscribers = inner.subscribers.len(), "subscribed");
        Ok(subscription_id)
    }

    fn unsubscribe_within(&self, ctx: &OpContext, id: SubscriptionId) -> Result<(), EventStoreError> {
        let mut inner = self.write(ctx)?;
        let removed = inner.subscribers.unsubscribe(id);

        tracing::debug!(subscription_id = %id, removed, "unsubscribed");
        Ok(())
    }
}

impl<P> EventRepublisher for InMemoryEventStore<P>
where
    P: Clone + Send + Sync,
{
    /// Fan every stored event out again, aggregate by aggregate.
    ///
    /// The context is re-checked between aggregates, so a cancelled or
    /// expired republish stops after a whole aggregate's history; subscribers
    /// may then have seen a prefix of the aggregates.
    fn republish_all_events_within(&self, ctx: &OpContext) -> Result<usize, EventStoreError> {
        let inner = self.write(ctx)?;

        let mut published = 0;
        for stream in inner.streams.values() {
            ctx.check()?;
            for event in &stream.events {
                inner.subscribers.publish(event);
                published += 1;
            }
        }

        tracing::debug!(
            aggregates = inner.streams.len(),
            events = published,
            subscribers = inner.subscribers.len(),
            "republished all events"
        );

        Ok(published)
    }
}
