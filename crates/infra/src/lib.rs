//! Infrastructure layer: event store implementations and their configuration.

pub mod config;
pub mod event_store;

mod integration_tests;

pub use config::StoreConfig;
pub use event_store::InMemoryEventStore;
