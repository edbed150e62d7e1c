//! Subscription handles
//!
//! A [`Subscription`] keeps a handler registered for as long as it lives.
//! It holds only a weak reference to the bus, so outliving the bus is fine.

use std::fmt;
use std::sync::Weak;

/// Identifier of a registered handler, unique within one bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Removal hook implemented by the bus internals
pub(crate) trait Unsubscribe: Send + Sync {
    fn remove(&self, topic: &str, id: SubscriptionId) -> bool;
}

/// Guard for a registered handler
///
/// The handler is removed when the guard is dropped or [`cancel`]led. Use
/// [`detach`] to keep the handler registered for the lifetime of the bus.
///
/// [`cancel`]: Subscription::cancel
/// [`detach`]: Subscription::detach
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, topic: String, registry: Weak<dyn Unsubscribe>) -> Self {
        Self {
            id,
            topic,
            registry: Some(registry),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Unsubscribe now, returning whether the handler was still registered
    pub fn cancel(mut self) -> bool {
        self.remove()
    }

    /// Leave the handler registered without keeping a guard
    pub fn detach(mut self) -> SubscriptionId {
        self.registry = None;
        self.id
    }

    fn remove(&mut self) -> bool {
        match self.registry.take().and_then(|weak| weak.upgrade()) {
            Some(registry) => registry.remove(&self.topic, self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}
