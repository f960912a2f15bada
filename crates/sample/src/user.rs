use serde::{Deserialize, Serialize};

use evkernel_core::{Aggregate, AggregateId, AggregateRoot, DomainResult, Event, RoutingError, TypeCoded};
use evkernel_events::{EventSourced, Passthrough, rehydrate};

/// Event: UserCreated, raised by [`User::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub aggregate_id: AggregateId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Event: UserFirstNameUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFirstNameUpdated {
    pub old_first: String,
    pub new_first: String,
}

/// Event: UserLastNameUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLastNameUpdated {
    pub old_last: String,
    pub new_last: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Created(UserCreated),
    FirstNameUpdated(UserFirstNameUpdated),
    LastNameUpdated(UserLastNameUpdated),
}

impl TypeCoded for UserEvent {
    fn type_code(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "user.created",
            UserEvent::FirstNameUpdated(_) => "user.first_name_updated",
            UserEvent::LastNameUpdated(_) => "user.last_name_updated",
        }
    }
}

/// Aggregate root: User.
///
/// Stores its typed events as-is (no transport encoding), so a store for
/// users is an `EventStore<UserEvent>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    aggregate: Aggregate<UserEvent>,
    first_name: String,
    last_name: String,
    email: String,
    created: bool,
}

impl User {
    pub fn new(first: impl Into<String>, last: impl Into<String>, email: impl Into<String>) -> DomainResult<Self> {
        let mut user = Self::blank(Aggregate::create()?);
        let aggregate_id = user.aggregate.id();

        user.raise(UserEvent::Created(UserCreated {
            aggregate_id,
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
        }))?;

        Ok(user)
    }

    pub fn from_history(history: &[Event<UserEvent>]) -> DomainResult<Self> {
        rehydrate(history, Self::blank)
    }

    fn blank(aggregate: Aggregate<UserEvent>) -> Self {
        Self {
            aggregate,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            created: false,
        }
    }

    pub fn update_first_name(&mut self, first: impl Into<String>) -> DomainResult<()> {
        let old_first = self.first_name.clone();
        self.raise(UserEvent::FirstNameUpdated(UserFirstNameUpdated {
            old_first,
            new_first: first.into(),
        }))?;
        Ok(())
    }

    pub fn update_last_name(&mut self, last: impl Into<String>) -> DomainResult<()> {
        let old_last = self.last_name.clone();
        self.raise(UserEvent::LastNameUpdated(UserLastNameUpdated {
            old_last,
            new_last: last.into(),
        }))?;
        Ok(())
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn uncommitted_events(&self) -> &[Event<UserEvent>] {
        self.aggregate.uncommitted()
    }
}

impl AggregateRoot for User {
    fn id(&self) -> AggregateId {
        self.aggregate.id()
    }

    fn version(&self) -> u64 {
        self.aggregate.version()
    }
}

impl EventSourced for User {
    type Payload = UserEvent;
    type Codec = Passthrough<UserEvent>;

    fn aggregate(&self) -> &Aggregate<UserEvent> {
        &self.aggregate
    }

    fn aggregate_mut(&mut self) -> &mut Aggregate<UserEvent> {
        &mut self.aggregate
    }

    fn route(&mut self, event: &Event<UserEvent>) -> Result<(), RoutingError> {
        let payload = event.payload();
        if self.created == matches!(payload, UserEvent::Created(_)) {
            let reason = if self.created {
                "user already created"
            } else {
                "user not created yet"
            };
            return Err(RoutingError::new(self.aggregate.id(), event.version(), reason));
        }

        match payload {
            UserEvent::Created(e) => {
                self.aggregate.set_id(e.aggregate_id);
                self.first_name = e.first_name.clone();
                self.last_name = e.last_name.clone();
                self.email = e.email.clone();
                self.created = true;
            }
            UserEvent::FirstNameUpdated(e) => self.first_name = e.new_first.clone(),
            UserEvent::LastNameUpdated(e) => self.last_name = e.new_last.clone(),
        }
        Ok(())
    }
}
