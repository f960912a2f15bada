//! Payload encoding between an aggregate's typed events and the form a store
//! holds.

use core::marker::PhantomData;

use evkernel_core::{DomainError, DomainResult, Event, TypeCoded};

/// Converts payloads to and from a transport form keyed by type code.
///
/// `encode` picks the type code for a payload kind; `decode` uses that code to
/// choose how to read the transport form back. A code with no decoder must
/// fail with [`DomainError::UnknownEventType`].
pub trait PayloadCodec {
    type Payload;
    type Transport: Clone + Send + Sync + 'static;

    fn encode(payload: &Self::Payload) -> DomainResult<(String, Self::Transport)>;

    fn decode(type_code: &str, transport: &Self::Transport) -> DomainResult<Self::Payload>;

    fn encode_event(event: &Event<Self::Payload>) -> DomainResult<Event<Self::Transport>> {
        event.try_map(|_, payload| Self::encode(payload))
    }

    fn decode_event(event: &Event<Self::Transport>) -> DomainResult<Event<Self::Payload>> {
        event.try_map(|code, transport| Ok((code.to_string(), Self::decode(code, transport)?)))
    }

    /// Encode a batch; the first failure aborts the whole batch.
    fn encode_all(events: &[Event<Self::Payload>]) -> DomainResult<Vec<Event<Self::Transport>>> {
        events.iter().map(Self::encode_event).collect()
    }

    /// Decode a batch; the first failure aborts the whole batch.
    fn decode_all(events: &[Event<Self::Transport>]) -> DomainResult<Vec<Event<Self::Payload>>> {
        events.iter().map(Self::decode_event).collect()
    }
}

/// Codec that stores typed payloads unchanged.
///
/// Decoding only checks that the recorded type code still names the payload
/// kind it is attached to.
pub struct Passthrough<P>(PhantomData<fn() -> P>);

impl<P> PayloadCodec for Passthrough<P>
where
    P: TypeCoded + Clone + Send + Sync + 'static,
{
    type Payload = P;
    type Transport = P;

    fn encode(payload: &P) -> DomainResult<(String, P)> {
        Ok((payload.type_code().to_string(), payload.clone()))
    }

    fn decode(type_code: &str, transport: &P) -> DomainResult<P> {
        if transport.type_code() != type_code {
            return Err(DomainError::codec(format!(
                "type code '{type_code}' does not match payload kind '{}'",
                transport.type_code()
            )));
        }
        Ok(transport.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evkernel_core::AggregateId;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Ping,
        Pong,
    }

    impl TypeCoded for Ping {
        fn type_code(&self) -> &'static str {
            match self {
                Ping::Ping => "PING",
                Ping::Pong => "PONG",
            }
        }
    }

    #[test]
    fn passthrough_keeps_payload_and_sets_type_code() {
        let id = AggregateId::generate().unwrap();
        let encoded = Passthrough::<Ping>::encode_event(&Event::new(id, 3, Ping::Pong, "")).unwrap();

        assert_eq!(encoded.type_code(), "PONG");
        assert_eq!(encoded.version(), 3);
        assert_eq!(encoded.source(), id);
        assert_eq!(encoded.payload(), &Ping::Pong);
    }

    #[test]
    fn passthrough_rejects_mismatched_type_code() {
        let id = AggregateId::generate().unwrap();
        let err = Passthrough::<Ping>::decode_event(&Event::new(id, 1, Ping::Ping, "PONG")).unwrap_err();
        assert!(matches!(err, DomainError::Codec(_)));
    }
}
