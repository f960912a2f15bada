//! Tracing/logging setup shared by benches, tests and embedding binaries.

/// Logging configuration (level, output format).
pub mod config;

/// Subscriber installation.
pub mod tracing;

pub use config::{LogFormat, ObservabilityConfig};

/// Initialize process-wide logging from `EVKERNEL_LOG_*` / `RUST_LOG`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging from an explicit configuration.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with(config: &ObservabilityConfig) -> bool {
    tracing::init_with(config)
}
