//! `evkernel-events` — event store, publisher and aggregate protocol contracts.
//!
//! This crate defines *what* a store and an event-sourced aggregate must do.
//! Concrete stores live in `evkernel-infra`.

pub mod bus;
pub mod codec;
pub mod context;
pub mod registry;
pub mod sourced;
pub mod store;

pub use bus::{EventCallback, EventPublisher, EventRepublisher};
pub use codec::{Passthrough, PayloadCodec};
pub use context::{CancellationToken, OpContext};
pub use registry::SubscriberRegistry;
pub use sourced::{CommitError, EventSourced, TransportOf, rehydrate};
pub use store::{EventStore, EventStoreError};
