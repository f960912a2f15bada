//! Integration tests for the full event-sourced pipeline.
//!
//! Tests: Command → Aggregate → EventStore → Subscribers → Rehydration
//!
//! Verifies:
//! - Stored history rebuilds the aggregate it came from
//! - Optimistic concurrency conflicts are detected (also across threads)
//! - Subscribers see each appended event before `store` returns
//! - Republishing rebuilds a projection from scratch
//! - Encode failures reach the caller and store nothing

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Barrier, Mutex};

    use serde_json::Value as JsonValue;

    use evkernel_core::{
        Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Event, RoutingError, TypeCoded,
    };
    use evkernel_events::{
        CancellationToken, CommitError, EventCallback, EventPublisher, EventRepublisher, EventSourced,
        EventStore, EventStoreError, OpContext, PayloadCodec,
    };
    use evkernel_sample::{
        TEST_AGG_CREATED_TYPE_CODE, TEST_AGG_FOO_UPDATED_TYPE_CODE, TestAgg, User, UserEvent,
    };

    use crate::event_store::InMemoryEventStore;

    fn created_and_updated() -> TestAgg {
        let mut agg = TestAgg::new("foo", "bar", "baz").unwrap();
        agg.update_foo("new foo").unwrap();
        agg
    }

    /// Records the type codes it sees.
    fn type_code_recorder(store: &InMemoryEventStore<JsonValue>) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: EventCallback<JsonValue> =
            Arc::new(move |e: &Event<JsonValue>| sink.lock().unwrap().push(e.type_code().to_string()));
        store.subscribe_events(callback).unwrap();
        seen
    }

    #[test]
    fn full_scenario_store_retrieve_rehydrate() {
        let store = InMemoryEventStore::new();
        let mut agg = created_and_updated();
        let id = agg.id();

        agg.store(&store).unwrap();

        assert!(agg.uncommitted_events().is_empty());
        assert_eq!(store.stored_version(id), Some(2));

        let history = store.retrieve_events(id).unwrap();
        let codes: Vec<&str> = history.iter().map(Event::type_code).collect();
        assert_eq!(codes, vec![TEST_AGG_CREATED_TYPE_CODE, TEST_AGG_FOO_UPDATED_TYPE_CODE]);
        assert!(history.iter().all(|e| e.source() == id));

        let rebuilt = TestAgg::from_history(&history).unwrap();
        assert_eq!(rebuilt.id(), id);
        assert_eq!(rebuilt.version(), 2);
        assert_eq!(rebuilt.foo(), "new foo");
        assert_eq!(rebuilt.bar(), "bar");
        assert_eq!(rebuilt.baz(), "baz");
        assert!(rebuilt.uncommitted_events().is_empty());
    }

    #[test]
    fn rehydrated_aggregate_continues_where_history_ended() {
        let store = InMemoryEventStore::new();
        let mut agg = created_and_updated();
        let id = agg.id();
        agg.store(&store).unwrap();

        let mut rebuilt = TestAgg::from_history(&store.retrieve_events(id).unwrap()).unwrap();
        rebuilt.update_foo("third").unwrap();
        rebuilt.store(&store).unwrap();

        let history = store.retrieve_events(id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].version(), 3);
        assert_eq!(store.stored_version(id), Some(3));
    }

    #[test]
    fn storing_the_same_snapshot_twice_conflicts() {
        let store = InMemoryEventStore::new();
        let agg = created_and_updated();
        let id = agg.id();

        // Two instances holding the same uncommitted events at the same version.
        let mut first = agg.clone();
        let mut second = agg;
        first.store(&store).unwrap();

        match second.store(&store) {
            Err(CommitError::Store(EventStoreError::Concurrency {
                aggregate_id,
                stored,
                submitted,
            })) => {
                assert_eq!(aggregate_id, id);
                assert_eq!(stored, 2);
                assert_eq!(submitted, 2);
            }
            other => panic!("expected concurrency conflict, got {other:?}"),
        }

        assert_eq!(second.uncommitted_events().len(), 2);
        assert_eq!(store.retrieve_events(id).unwrap().len(), 2);
    }

    #[test]
    fn retrieving_a_never_stored_aggregate_is_not_found() {
        let store: InMemoryEventStore<JsonValue> = InMemoryEventStore::new();
        let id = AggregateId::generate().unwrap();

        assert!(matches!(store.retrieve_events(id), Err(EventStoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn subscriber_sees_events_before_store_returns_and_not_after_unsubscribe() {
        let store: InMemoryEventStore<JsonValue> = InMemoryEventStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: EventCallback<JsonValue> =
            Arc::new(move |e: &Event<JsonValue>| sink.lock().unwrap().push(e.source()));
        let subscription = store.subscribe_events(callback).unwrap();

        let mut first = TestAgg::new("a", "b", "c").unwrap();
        first.store(&store).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![first.id()]);

        store.unsubscribe(subscription).unwrap();

        let mut second = TestAgg::new("d", "e", "f").unwrap();
        second.store(&store).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn rehydration_publishes_nothing() {
        let store = InMemoryEventStore::new();
        let mut agg = created_and_updated();
        let id = agg.id();
        agg.store(&store).unwrap();

        let seen = type_code_recorder(&store);
        let history = store.retrieve_events(id).unwrap();
        let _rebuilt = TestAgg::from_history(&history).unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn republish_rebuilds_a_projection() {
        let store = InMemoryEventStore::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut agg = TestAgg::new(format!("foo-{i}"), "bar", "baz").unwrap();
            agg.update_foo(format!("updated-{i}")).unwrap();
            ids.push(agg.id());
            agg.store(&store).unwrap();
        }

        // Latest foo value per aggregate, built only from published events.
        let projection: Arc<Mutex<HashMap<AggregateId, String>>> = Arc::new(Mutex::new(HashMap::new()));
        let sink = projection.clone();
        let callback: EventCallback<JsonValue> = Arc::new(move |e: &Event<JsonValue>| {
            let foo = e
                .payload()
                .get("foo")
                .or_else(|| e.payload().get("new_foo"))
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string();
            sink.lock().unwrap().insert(e.source(), foo);
        });
        store.subscribe_events(callback).unwrap();

        let published = store.republish_all_events().unwrap();

        assert_eq!(published, 6);
        let projection = projection.lock().unwrap();
        assert_eq!(projection.len(), 3);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(projection[id], format!("updated-{i}"));
        }
    }

    #[test]
    fn republish_with_no_subscribers_is_harmless() {
        let store = InMemoryEventStore::new();
        let mut agg = created_and_updated();
        agg.store(&store).unwrap();

        assert_eq!(store.republish_all_events().unwrap(), 2);
        assert_eq!(store.event_count(), 2);
    }

    #[test]
    fn concurrent_commits_of_the_same_version_have_exactly_one_winner() {
        const THREADS: usize = 8;

        let store: Arc<InMemoryEventStore<JsonValue>> = Arc::new(InMemoryEventStore::new());
        let agg = created_and_updated();
        let id = agg.id();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = store.clone();
                let barrier = barrier.clone();
                let mut copy = agg.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    copy.store(&store)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CommitError::Store(EventStoreError::Concurrency { .. }))))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(conflicts, THREADS - 1);
        assert_eq!(store.retrieve_events(id).unwrap().len(), 2);
    }

    #[test]
    fn cancelled_commit_keeps_the_uncommitted_buffer() {
        let store = InMemoryEventStore::new();
        let mut agg = created_and_updated();
        let token = CancellationToken::new();
        token.cancel();
        let ctx = OpContext::new().with_cancellation(token);

        let err = agg.store_within(&ctx, &store).unwrap_err();

        assert!(matches!(err, CommitError::Store(EventStoreError::Cancelled)));
        assert_eq!(agg.uncommitted_events().len(), 2);
        assert_eq!(store.stored_version(agg.id()), None);

        // The same instance can still commit once the caller stops cancelling.
        agg.store(&store).unwrap();
        assert_eq!(store.stored_version(agg.id()), Some(2));
    }

    #[test]
    fn typed_store_round_trips_users() {
        let store: InMemoryEventStore<UserEvent> = InMemoryEventStore::new();
        let mut user = User::new("first", "last", "user@example.com").unwrap();
        user.update_first_name("renamed").unwrap();
        user.update_last_name("changed").unwrap();
        user.store(&store).unwrap();

        let history = store.retrieve_events(user.id()).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].type_code(), "user.created");

        let rebuilt = User::from_history(&history).unwrap();
        assert_eq!(rebuilt, user);
        assert_eq!(rebuilt.first_name(), "renamed");
        assert_eq!(rebuilt.last_name(), "changed");
        assert_eq!(rebuilt.version(), 3);
    }

    #[test]
    fn shared_store_handle_works_through_arc() {
        let store: Arc<InMemoryEventStore<JsonValue>> = Arc::new(InMemoryEventStore::new());
        let seen = type_code_recorder(&store);

        let mut agg = created_and_updated();
        agg.store(&store).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![TEST_AGG_CREATED_TYPE_CODE, TEST_AGG_FOO_UPDATED_TYPE_CODE]
        );
    }

    /// Payload kind the codec below refuses to encode.
    #[derive(Debug, Clone)]
    enum Unencodable {
        Made,
    }

    impl TypeCoded for Unencodable {
        fn type_code(&self) -> &'static str {
            "UNENC"
        }
    }

    struct RejectingCodec;

    impl PayloadCodec for RejectingCodec {
        type Payload = Unencodable;
        type Transport = JsonValue;

        fn encode(payload: &Unencodable) -> DomainResult<(String, JsonValue)> {
            Err(DomainError::unknown_event_type(payload.type_code()))
        }

        fn decode(type_code: &str, _transport: &JsonValue) -> DomainResult<Unencodable> {
            Err(DomainError::unknown_event_type(type_code))
        }
    }

    struct Opaque {
        aggregate: Aggregate<Unencodable>,
    }

    impl EventSourced for Opaque {
        type Payload = Unencodable;
        type Codec = RejectingCodec;

        fn aggregate(&self) -> &Aggregate<Unencodable> {
            &self.aggregate
        }

        fn aggregate_mut(&mut self) -> &mut Aggregate<Unencodable> {
            &mut self.aggregate
        }

        fn route(&mut self, _event: &Event<Unencodable>) -> Result<(), RoutingError> {
            Ok(())
        }
    }

    #[test]
    fn encode_failure_is_reported_and_nothing_is_stored() {
        let store: InMemoryEventStore<JsonValue> = InMemoryEventStore::new();
        let seen = type_code_recorder(&store);
        let mut opaque = Opaque {
            aggregate: Aggregate::create().unwrap(),
        };
        opaque.raise(Unencodable::Made).unwrap();
        let id = opaque.aggregate.id();

        match opaque.store(&store) {
            Err(CommitError::Encode(DomainError::UnknownEventType(code))) => assert_eq!(code, "UNENC"),
            other => panic!("expected encode failure, got {other:?}"),
        }

        assert_eq!(opaque.aggregate.uncommitted().len(), 1);
        assert_eq!(opaque.aggregate.version(), 1);
        assert_eq!(store.stored_version(id), None);
        assert!(matches!(store.retrieve_events(id), Err(EventStoreError::NotFound(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// Any number of updates survives a store/retrieve/rehydrate cycle.
            #[test]
            fn rehydration_matches_committed_state(updates in proptest::collection::vec("[a-z]{1,6}", 0..12)) {
                let store = InMemoryEventStore::new();
                let mut agg = TestAgg::new("foo", "bar", "baz").unwrap();
                for value in &updates {
                    agg.update_foo(value.clone()).unwrap();
                }
                agg.store(&store).unwrap();

                let history = store.retrieve_events(agg.id()).unwrap();
                let rebuilt = TestAgg::from_history(&history).unwrap();

                prop_assert_eq!(history.len(), updates.len() + 1);
                prop_assert_eq!(rebuilt.version(), updates.len() as u64 + 1);
                prop_assert_eq!(rebuilt, agg);
            }
        }
    }
}
