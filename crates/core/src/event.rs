use serde::{Deserialize, Serialize};

use crate::error::DomainResult;
use crate::id::AggregateId;

/// One recorded state change of an aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **ordered** per aggregate by `version` (1, 2, 3, ...)
/// - **typed** by `type_code`, the discriminator used to interpret `payload`
///
/// `P` is whatever the holder needs: a domain enum inside an aggregate, or an
/// opaque transport form (e.g. JSON) inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event<P> {
    source: AggregateId,
    version: u64,
    payload: P,
    type_code: String,
}

impl<P> Event<P> {
    pub fn new(source: AggregateId, version: u64, payload: P, type_code: impl Into<String>) -> Self {
        Self {
            source,
            version,
            payload,
            type_code: type_code.into(),
        }
    }

    /// Build an event whose type code comes from the payload itself.
    pub fn typed(source: AggregateId, version: u64, payload: P) -> Self
    where
        P: TypeCoded,
    {
        let type_code = payload.type_code();
        Self::new(source, version, payload, type_code)
    }

    pub fn source(&self) -> AggregateId {
        self.source
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    /// Swap the payload for another representation, keeping source and version.
    ///
    /// `f` returns the new type code alongside the new payload.
    pub fn try_map<Q>(&self, f: impl FnOnce(&str, &P) -> DomainResult<(String, Q)>) -> DomainResult<Event<Q>> {
        let (type_code, payload) = f(&self.type_code, &self.payload)?;
        Ok(Event {
            source: self.source,
            version: self.version,
            payload,
            type_code,
        })
    }
}

/// A payload that knows its own stable discriminator (e.g. "TACRE").
pub trait TypeCoded {
    fn type_code(&self) -> &'static str;
}
