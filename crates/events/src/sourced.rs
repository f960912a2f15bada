//! The command → apply → route → store protocol for event-sourced aggregates.
//!
//! A domain aggregate owns one [`Aggregate`] accumulator next to its business
//! fields and implements [`EventSourced`]. It then gets:
//!
//! - **apply**: route + buffer, for new events raised by commands
//! - **replay**: version bump + route only, for rehydration
//! - **store**: encode the buffer, append it, clear it on success
//!
//! ```text
//! command ──► raise ──► apply ──► route (mutate fields)
//!                          └────► buffer (uncommitted)
//! store ──► encode buffer ──► EventStore::store_events ──► clear buffer
//! history ──► decode ──► replay ──► route (no buffering, no publication)
//! ```

use thiserror::Error;

use evkernel_core::{Aggregate, DomainError, DomainResult, Event, RoutingError, TypeCoded};

use crate::codec::PayloadCodec;
use crate::context::OpContext;
use crate::store::{EventStore, EventStoreError};

/// Transport form an aggregate's events take inside an event store.
pub type TransportOf<A> = <<A as EventSourced>::Codec as PayloadCodec>::Transport;

/// Failure while persisting an aggregate's uncommitted events.
///
/// In both cases the uncommitted buffer is left intact.
#[derive(Debug, Error)]
pub enum CommitError {
    /// A buffered payload could not be encoded for the store.
    #[error("encoding uncommitted events failed: {0}")]
    Encode(DomainError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// Capability of a domain type to be event sourced.
///
/// Implementors provide access to their accumulator, a codec, and `route`.
/// `route` must be an exhaustive `match` over the payload enum whose arms
/// only mutate fields: no IO, no new events. Return [`RoutingError`] for an
/// event the aggregate cannot take in its current state, before touching any
/// field. A command rejected that way leaves the instance as it was.
pub trait EventSourced: Sized {
    type Payload: TypeCoded + Clone + core::fmt::Debug;
    type Codec: PayloadCodec<Payload = Self::Payload>;

    fn aggregate(&self) -> &Aggregate<Self::Payload>;

    fn aggregate_mut(&mut self) -> &mut Aggregate<Self::Payload>;

    /// Dispatch an event to its state-mutation handler.
    fn route(&mut self, event: &Event<Self::Payload>) -> Result<(), RoutingError>;

    /// Route an event, then buffer it as uncommitted.
    ///
    /// Only for events raised by commands; replay goes through `route` alone.
    fn apply(&mut self, event: Event<Self::Payload>) -> Result<(), RoutingError> {
        self.route(&event)?;
        self.aggregate_mut().record(event);
        Ok(())
    }

    /// Command helper: bump the version and apply `payload` as the next event.
    ///
    /// If `route` rejects the event the version bump is undone, so the
    /// instance can keep taking commands.
    fn raise(&mut self, payload: Self::Payload) -> Result<(), RoutingError> {
        let aggregate = self.aggregate_mut();
        let version = aggregate.next_version();
        let event = Event::typed(aggregate.id(), version, payload);
        if let Err(err) = self.apply(event) {
            self.aggregate_mut().rewind_version();
            return Err(err);
        }
        Ok(())
    }

    /// Rebuild state from typed history: one version bump + `route` per event.
    fn replay<I>(&mut self, history: I) -> Result<(), RoutingError>
    where
        I: IntoIterator<Item = Event<Self::Payload>>,
    {
        for event in history {
            self.aggregate_mut().next_version();
            self.route(&event)?;
        }
        Ok(())
    }

    /// Decode stored history, then replay it.
    ///
    /// Everything is decoded before the first event is routed, so an unknown
    /// type code leaves the instance untouched.
    fn replay_encoded(&mut self, history: &[Event<TransportOf<Self>>]) -> DomainResult<()> {
        let decoded = Self::Codec::decode_all(history)?;
        self.replay(decoded)?;
        Ok(())
    }

    fn store<S>(&mut self, store: &S) -> Result<(), CommitError>
    where
        S: EventStore<TransportOf<Self>> + ?Sized,
    {
        self.store_within(&OpContext::default(), store)
    }

    /// Encode the uncommitted buffer and append it with the current id/version.
    ///
    /// The buffer is cleared only after the store accepted the append.
    fn store_within<S>(&mut self, ctx: &OpContext, store: &S) -> Result<(), CommitError>
    where
        S: EventStore<TransportOf<Self>> + ?Sized,
    {
        let outgoing = {
            let aggregate = self.aggregate();
            let encoded = Self::Codec::encode_all(aggregate.uncommitted()).map_err(CommitError::Encode)?;
            Aggregate::from_parts(aggregate.id(), aggregate.version(), encoded)
        };

        tracing::debug!(
            aggregate_id = %outgoing.id(),
            version = outgoing.version(),
            events = outgoing.uncommitted().len(),
            "storing uncommitted events"
        );

        store.store_events_within(ctx, &outgoing)?;
        self.aggregate_mut().clear_uncommitted();
        Ok(())
    }
}

/// Rehydration constructor shared by domain types.
///
/// Starts a version-0 accumulator keyed by the history's source id, hands it
/// to `blank` to build an instance with no business state, and replays the
/// history into it.
pub fn rehydrate<A>(
    history: &[Event<TransportOf<A>>],
    blank: impl FnOnce(Aggregate<A::Payload>) -> A,
) -> DomainResult<A>
where
    A: EventSourced,
{
    let first = history.first().ok_or(DomainError::EmptyHistory)?;
    let mut instance = blank(Aggregate::with_id(first.source()));
    instance.replay_encoded(history)?;

    tracing::debug!(
        aggregate_id = %instance.aggregate().id(),
        version = instance.aggregate().version(),
        "rehydrated aggregate"
    );

    Ok(instance)
}
