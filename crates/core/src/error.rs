//! Domain error model.

use thiserror::Error;

use crate::id::AggregateId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Covers failures raised while building, encoding, decoding and replaying
/// events. Store-level failures (conflicts, missing history) live with the
/// event store contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A payload kind or type code has no known encoder/decoder.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A payload failed to encode or decode.
    #[error("payload codec failed: {0}")]
    Codec(String),

    /// The randomness source could not produce an identifier.
    #[error("identifier generation failed: {0}")]
    IdGeneration(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Rehydration was attempted from an empty history.
    #[error("cannot rehydrate from an empty history")]
    EmptyHistory,

    /// An event could not be routed to a handler.
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl DomainError {
    pub fn unknown_event_type(kind: impl Into<String>) -> Self {
        Self::UnknownEventType(kind.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// An event reached `route` that the aggregate has no handler for in its
/// current state.
///
/// This is a schema or programming mismatch, not a runtime condition. The
/// operation that hit it must stop; continuing would leave partially applied
/// state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot route event v{version} to aggregate {aggregate_id}: {reason}")]
pub struct RoutingError {
    pub aggregate_id: AggregateId,
    pub version: u64,
    pub reason: String,
}

impl RoutingError {
    pub fn new(aggregate_id: AggregateId, version: u64, reason: impl Into<String>) -> Self {
        Self {
            aggregate_id,
            version,
            reason: reason.into(),
        }
    }
}
