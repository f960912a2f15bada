//! Event-sourcing bookkeeping for one aggregate instance.

use crate::error::DomainResult;
use crate::event::Event;
use crate::id::AggregateId;

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Returns the aggregate identifier.
    fn id(&self) -> AggregateId;

    /// Number of events ever applied to this instance (committed + uncommitted).
    fn version(&self) -> u64;
}

/// Accumulator of uncommitted events for one aggregate instance.
///
/// Domain types own one of these next to their business fields. It carries
/// no business state itself: only the identifier, the running version and
/// the events recorded since the last successful store.
///
/// Invariant: `version` equals the number of events applied to this
/// instance so far, so it is 1 right after a creation event and equals the
/// history length right after rehydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate<P> {
    id: AggregateId,
    events: Vec<Event<P>>,
    version: u64,
}

impl<P> Aggregate<P> {
    /// Accumulator for a brand-new aggregate with a freshly generated id.
    pub fn create() -> DomainResult<Self> {
        Ok(Self::with_id(AggregateId::generate()?))
    }

    /// Accumulator at version 0 with an empty buffer, used before replay.
    pub fn with_id(id: AggregateId) -> Self {
        Self {
            id,
            events: Vec::new(),
            version: 0,
        }
    }

    /// Snapshot handed to an event store: id, version and events to append.
    pub fn from_parts(id: AggregateId, version: u64, events: Vec<Event<P>>) -> Self {
        Self { id, events, version }
    }

    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn set_id(&mut self, id: AggregateId) {
        self.id = id;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Advance the version by one and return the new value.
    pub fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Undo the last [`next_version`](Self::next_version) for an event that
    /// was never applied.
    pub fn rewind_version(&mut self) {
        self.version = self.version.saturating_sub(1);
    }

    pub fn uncommitted(&self) -> &[Event<P>] {
        &self.events
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn record(&mut self, event: Event<P>) {
        self.events.push(event);
    }

    pub fn clear_uncommitted(&mut self) {
        self.events.clear();
    }
}

impl<P> AggregateRoot for Aggregate<P> {
    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
