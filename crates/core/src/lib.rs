//! `evkernel-core` — event-sourcing building blocks.
//!
//! This crate contains **pure** primitives (no storage, no locking): identifiers,
//! the event value type and the per-aggregate accumulator of uncommitted events.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult, RoutingError};
pub use event::{Event, TypeCoded};
pub use id::{AggregateId, SubscriptionId, generate_uuid_v4};
