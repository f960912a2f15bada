//! Store configuration.

use std::time::Duration;

use config::{ConfigBuilder, Environment, builder::DefaultState};
use serde::Deserialize;

/// Tuning for [`InMemoryEventStore`](crate::event_store::InMemoryEventStore).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on waiting for the store lock when the caller's context
    /// carries no deadline. `None` waits forever.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,

    /// Number of aggregate histories to pre-allocate room for.
    #[serde(default)]
    pub initial_capacity: usize,
}

impl StoreConfig {
    /// Load from `EVKERNEL_STORE_*` environment variables
    /// (e.g. `EVKERNEL_STORE_LOCK_TIMEOUT_MS=500`).
    pub fn load() -> anyhow::Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(Environment::with_prefix("EVKERNEL_STORE").try_parsing(true)),
        )
    }

    /// Build from an already assembled set of sources.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let cfg: StoreConfig = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
