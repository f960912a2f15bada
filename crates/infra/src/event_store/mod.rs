//! Event store implementations.
//!
//! The contracts (`EventStore`, `EventPublisher`, `EventRepublisher`) live in
//! `evkernel-events`; this module provides the reference in-memory store.

pub mod in_memory;

pub use in_memory::InMemoryEventStore;
