//! The event bus and its dispatch loop

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::subscription::{Subscription, SubscriptionId, Unsubscribe};

type Handler<V> = Arc<dyn Fn(&V) -> HandlerResult + Send + Sync>;

struct Subscriber<V> {
    id: SubscriptionId,
    handler: Handler<V>,
}

struct Inner<V> {
    topics: RwLock<HashMap<String, Vec<Subscriber<V>>>>,
    next_id: AtomicU64,
}

impl<V> Unsubscribe for Inner<V>
where
    V: Send + Sync + 'static,
{
    fn remove(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            topics.remove(topic);
        }

        removed
    }
}

/// A handler failure recorded during one `publish`
#[derive(Debug)]
pub struct DispatchFailure {
    pub subscription: SubscriptionId,
    pub error: HandlerError,
}

/// Outcome of one `publish` call
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Handlers that ran to completion without error
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    /// Number of handlers invoked, successful or not
    pub fn invoked(&self) -> usize {
        self.delivered + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Topic-keyed publish/subscribe registry
///
/// Cloning the bus yields another handle to the same registry.
///
/// # Dispatch Semantics
///
/// `publish` takes a snapshot of the handlers registered for the topic and
/// invokes them one by one on the calling thread. A handler registered while
/// a publish is running does not see that publish; one removed while it is
/// running may still receive it. No lock is held while handlers run.
///
/// # Example
///
/// ```rust
/// use event_bus::{EventBus, HandlerError};
///
/// let bus = EventBus::<i64>::new();
///
/// let _failing = bus.subscribe("a:b:c", |_: &i64| Err(HandlerError::failed("nope")));
/// let _working = bus.subscribe("a:b:c", |_: &i64| Ok(()));
///
/// let report = bus.publish("a:b:c", 1);
/// assert_eq!(report.delivered, 1);
/// assert_eq!(report.failures.len(), 1);
/// ```
pub struct EventBus<V> {
    inner: Arc<Inner<V>>,
}

impl<V> EventBus<V>
where
    V: Send + Sync + 'static,
{
    /// Create a new empty bus
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a handler for a topic
    ///
    /// The handler stays registered while the returned [`Subscription`]
    /// lives.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&V) -> HandlerResult + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = SubscriptionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        self.inner
            .topics
            .write()
            .entry(topic.clone())
            .or_default()
            .push(Subscriber {
                id,
                handler: Arc::new(handler),
            });

        trace!(%id, topic = %topic, "Subscribed");

        let registry: Weak<dyn Unsubscribe> = Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription::new(id, topic, registry)
    }

    /// Remove a handler by id, returning whether it was registered
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        self.inner.remove(topic, id)
    }

    /// Invoke every handler registered for `topic` with `value`
    ///
    /// Handler errors and panics are logged and collected in the report;
    /// they never prevent the remaining handlers from running.
    pub fn publish(&self, topic: &str, value: V) -> DispatchReport {
        let snapshot: Vec<(SubscriptionId, Handler<V>)> =
            match self.inner.topics.read().get(topic) {
                Some(subscribers) => subscribers
                    .iter()
                    .map(|s| (s.id, Arc::clone(&s.handler)))
                    .collect(),
                None => return DispatchReport::default(),
            };

        let mut report = DispatchReport::default();

        for (id, handler) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&value)));

            let error = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(error)) => error,
                Err(payload) => HandlerError::Panicked(panic_message(payload.as_ref())),
            };

            warn!(%id, topic, error = %error, "Event handler failed");
            report.failures.push(DispatchFailure {
                subscription: id,
                error,
            });
        }

        report
    }

    /// Number of handlers registered for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Number of topics with at least one handler
    pub fn topic_count(&self) -> usize {
        self.inner.topics.read().len()
    }

    /// All topics with at least one handler, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.topics.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Remove every handler
    ///
    /// Outstanding [`Subscription`] guards become inert.
    pub fn clear(&self) {
        self.inner.topics.write().clear();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<V> Default for EventBus<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for EventBus<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for EventBus<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topic_count", &self.inner.topics.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn new_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::<i64>::new();
        let report = bus.publish("nobody:listens:here", 1);
        assert_eq!(report.invoked(), 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::<i64>::new();
        let log = new_log();

        let first = Arc::clone(&log);
        let _a = bus.subscribe("t", move |v: &i64| {
            first.lock().push(format!("first:{}", v));
            Ok(())
        });
        let second = Arc::clone(&log);
        let _b = bus.subscribe("t", move |v: &i64| {
            second.lock().push(format!("second:{}", v));
            Ok(())
        });

        let report = bus.publish("t", 5);
        assert_eq!(report.delivered, 2);
        assert_eq!(*log.lock(), vec!["first:5", "second:5"]);
    }

    #[test]
    fn test_exact_topic_matching() {
        let bus = EventBus::<i64>::new();
        let log = new_log();

        let sink = Arc::clone(&log);
        let _s = bus.subscribe("zone1:light:status", move |v: &i64| {
            sink.lock().push(v.to_string());
            Ok(())
        });

        bus.publish("zone1:light:statu", 1);
        bus.publish("zone1:light:status:", 2);
        bus.publish("ZONE1:light:status", 3);
        bus.publish("zone1:light:status", 4);

        assert_eq!(*log.lock(), vec!["4"]);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let bus = EventBus::<i64>::new();
        let log = new_log();

        let _failing = bus.subscribe("t", |_: &i64| Err(HandlerError::failed("first fails")));
        let sink = Arc::clone(&log);
        let _second = bus.subscribe("t", move |v: &i64| {
            sink.lock().push(v.to_string());
            Ok(())
        });

        let report = bus.publish("t", 9);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, HandlerError::Failed(_)));
        assert_eq!(*log.lock(), vec!["9"]);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = EventBus::<i64>::new();
        let log = new_log();

        let _panics = bus.subscribe("t", |_: &i64| panic!("handler exploded"));
        let sink = Arc::clone(&log);
        let _second = bus.subscribe("t", move |v: &i64| {
            sink.lock().push(v.to_string());
            Ok(())
        });

        let report = bus.publish("t", 3);
        assert_eq!(report.delivered, 1);
        match &report.failures[0].error {
            HandlerError::Panicked(message) => assert_eq!(message, "handler exploded"),
            other => panic!("Expected Panicked, got {:?}", other),
        }
        assert_eq!(*log.lock(), vec!["3"]);
    }

    #[test]
    fn test_drop_subscription_unsubscribes() {
        let bus = EventBus::<i64>::new();

        let subscription = bus.subscribe("t", |_: &i64| Ok(()));
        assert_eq!(bus.subscriber_count("t"), 1);
        assert_eq!(bus.topic_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count("t"), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_cancel_and_detach() {
        let bus = EventBus::<i64>::new();

        let cancelled = bus.subscribe("t", |_: &i64| Ok(()));
        assert!(cancelled.cancel());

        let detached = bus.subscribe("t", |_: &i64| Ok(()));
        let id = detached.detach();
        assert_eq!(bus.subscriber_count("t"), 1);

        assert!(bus.unsubscribe("t", id));
        assert!(!bus.unsubscribe("t", id));
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = EventBus::<i64>::new();
        let subscription = bus.subscribe("t", |_: &i64| Ok(()));
        drop(bus);
        assert!(!subscription.cancel());
    }

    #[test]
    fn test_subscribe_during_dispatch_sees_next_publish_only() {
        let bus = EventBus::<i64>::new();
        let log = new_log();
        let late_guards: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let guards = Arc::clone(&late_guards);
        let sink = Arc::clone(&log);
        let _registrar = bus.subscribe("t", move |_: &i64| {
            let sink = Arc::clone(&sink);
            let guard = inner_bus.subscribe("t", move |v: &i64| {
                sink.lock().push(format!("late:{}", v));
                Ok(())
            });
            guards.lock().push(guard);
            Ok(())
        });

        let report = bus.publish("t", 1);
        assert_eq!(report.invoked(), 1);
        assert!(log.lock().is_empty());

        bus.publish("t", 2);
        assert_eq!(*log.lock(), vec!["late:2"]);
    }

    #[test]
    fn test_reentrant_publish() {
        let bus = EventBus::<i64>::new();
        let log = new_log();

        let inner_bus = bus.clone();
        let _relay = bus.subscribe("in", move |v: &i64| {
            inner_bus.publish("out", v * 10);
            Ok(())
        });
        let sink = Arc::clone(&log);
        let _out = bus.subscribe("out", move |v: &i64| {
            sink.lock().push(v.to_string());
            Ok(())
        });

        bus.publish("in", 4);
        assert_eq!(*log.lock(), vec!["40"]);
    }

    #[test]
    fn test_topics_sorted_and_clear() {
        let bus = EventBus::<i64>::new();
        let _b = bus.subscribe("b", |_: &i64| Ok(()));
        let a = bus.subscribe("a", |_: &i64| Ok(()));

        assert_eq!(bus.topics(), vec!["a".to_string(), "b".to_string()]);

        bus.clear();
        assert_eq!(bus.topic_count(), 0);
        assert!(!a.cancel());
    }
}
