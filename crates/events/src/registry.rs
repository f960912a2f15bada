//! Ordered table of subscriber callbacks.

use evkernel_core::{DomainResult, Event, SubscriptionId};

use crate::bus::EventCallback;

struct Subscriber<P> {
    id: SubscriptionId,
    callback: EventCallback<P>,
}

/// Subscriber registry used by publishing stores.
///
/// - Fan-out follows registration order
/// - No locking of its own: the owning store guards it with the same lock
///   that guards its histories, so publication happens inside the append's
///   critical section
pub struct SubscriberRegistry<P> {
    subscribers: Vec<Subscriber<P>>,
}

impl<P> SubscriberRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under a freshly generated id.
    pub fn subscribe(&mut self, callback: EventCallback<P>) -> DomainResult<SubscriptionId> {
        let id = SubscriptionId::generate()?;
        self.subscribers.push(Subscriber { id, callback });
        Ok(id)
    }

    /// Remove the registration for `id`. Returns whether one was removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != id);
        self.subscribers.len() != before
    }

    /// Invoke every callback once with `event`, in registration order.
    pub fn publish(&self, event: &Event<P>) {
        for sub in &self.subscribers {
            (sub.callback)(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<P> Default for SubscriberRegistry<P> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<P> core::fmt::Debug for SubscriberRegistry<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.subscribers.iter().map(|sub| sub.id))
            .finish()
    }
}
