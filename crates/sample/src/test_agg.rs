use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use evkernel_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Event, RoutingError, TypeCoded,
};
use evkernel_events::{EventSourced, PayloadCodec, rehydrate};

/// Type codes recorded with stored events, used to pick a decoder on replay.
pub const TEST_AGG_CREATED_TYPE_CODE: &str = "TACRE";
pub const TEST_AGG_FOO_UPDATED_TYPE_CODE: &str = "TAFU";

/// Event: TestAggCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAggCreated {
    pub aggregate_id: AggregateId,
    pub foo: String,
    pub bar: String,
    pub baz: String,
}

/// Event: TestAggFooUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAggFooUpdated {
    pub aggregate_id: AggregateId,
    pub new_foo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestAggEvent {
    Created(TestAggCreated),
    FooUpdated(TestAggFooUpdated),
}

impl TypeCoded for TestAggEvent {
    fn type_code(&self) -> &'static str {
        match self {
            TestAggEvent::Created(_) => TEST_AGG_CREATED_TYPE_CODE,
            TestAggEvent::FooUpdated(_) => TEST_AGG_FOO_UPDATED_TYPE_CODE,
        }
    }
}

/// JSON codec for [`TestAggEvent`].
pub struct TestAggCodec;

impl PayloadCodec for TestAggCodec {
    type Payload = TestAggEvent;
    type Transport = JsonValue;

    fn encode(payload: &TestAggEvent) -> DomainResult<(String, JsonValue)> {
        let encoded = match payload {
            TestAggEvent::Created(e) => serde_json::to_value(e),
            TestAggEvent::FooUpdated(e) => serde_json::to_value(e),
        }
        .map_err(|e| DomainError::codec(format!("{}: {e}", payload.type_code())))?;

        Ok((payload.type_code().to_string(), encoded))
    }

    fn decode(type_code: &str, transport: &JsonValue) -> DomainResult<TestAggEvent> {
        let decoded = match type_code {
            TEST_AGG_CREATED_TYPE_CODE => {
                serde_json::from_value(transport.clone()).map(TestAggEvent::Created)
            }
            TEST_AGG_FOO_UPDATED_TYPE_CODE => {
                serde_json::from_value(transport.clone()).map(TestAggEvent::FooUpdated)
            }
            other => return Err(DomainError::unknown_event_type(other)),
        };
        decoded.map_err(|e| DomainError::codec(format!("{type_code}: {e}")))
    }
}

/// Aggregate root: TestAgg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAgg {
    aggregate: Aggregate<TestAggEvent>,
    foo: String,
    bar: String,
    baz: String,
    created: bool,
}

impl TestAgg {
    /// Create command: a new aggregate with one uncommitted creation event.
    pub fn new(foo: impl Into<String>, bar: impl Into<String>, baz: impl Into<String>) -> DomainResult<Self> {
        let mut agg = Self::blank(Aggregate::create()?);
        let aggregate_id = agg.aggregate.id();

        agg.raise(TestAggEvent::Created(TestAggCreated {
            aggregate_id,
            foo: foo.into(),
            bar: bar.into(),
            baz: baz.into(),
        }))?;

        Ok(agg)
    }

    /// Rebuild from stored history.
    pub fn from_history(history: &[Event<JsonValue>]) -> DomainResult<Self> {
        rehydrate(history, Self::blank)
    }

    fn blank(aggregate: Aggregate<TestAggEvent>) -> Self {
        Self {
            aggregate,
            foo: String::new(),
            bar: String::new(),
            baz: String::new(),
            created: false,
        }
    }

    /// Command: replace `foo`.
    pub fn update_foo(&mut self, new_foo: impl Into<String>) -> DomainResult<()> {
        let aggregate_id = self.aggregate.id();
        self.raise(TestAggEvent::FooUpdated(TestAggFooUpdated {
            aggregate_id,
            new_foo: new_foo.into(),
        }))?;
        Ok(())
    }

    pub fn foo(&self) -> &str {
        &self.foo
    }

    pub fn bar(&self) -> &str {
        &self.bar
    }

    pub fn baz(&self) -> &str {
        &self.baz
    }

    pub fn uncommitted_events(&self) -> &[Event<TestAggEvent>] {
        self.aggregate.uncommitted()
    }
}

impl AggregateRoot for TestAgg {
    fn id(&self) -> AggregateId {
        self.aggregate.id()
    }

    fn version(&self) -> u64 {
        self.aggregate.version()
    }
}

impl EventSourced for TestAgg {
    type Payload = TestAggEvent;
    type Codec = TestAggCodec;

    fn aggregate(&self) -> &Aggregate<TestAggEvent> {
        &self.aggregate
    }

    fn aggregate_mut(&mut self) -> &mut Aggregate<TestAggEvent> {
        &mut self.aggregate
    }

    fn route(&mut self, event: &Event<TestAggEvent>) -> Result<(), RoutingError> {
        match event.payload() {
            TestAggEvent::Created(e) => {
                if self.created {
                    return Err(self.routing_error(event, "aggregate already created"));
                }
                self.aggregate.set_id(e.aggregate_id);
                self.foo = e.foo.clone();
                self.bar = e.bar.clone();
                self.baz = e.baz.clone();
                self.created = true;
            }
            TestAggEvent::FooUpdated(e) => {
                if !self.created {
                    return Err(self.routing_error(event, "update before creation"));
                }
                self.foo = e.new_foo.clone();
            }
        }
        Ok(())
    }
}

impl TestAgg {
    fn routing_error(&self, event: &Event<TestAggEvent>, reason: &str) -> RoutingError {
        RoutingError::new(
            self.aggregate.id(),
            event.version(),
            format!("{} ({reason})", event.type_code()),
        )
    }
}
