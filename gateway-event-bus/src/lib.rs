//! Topic-keyed Event Bus
//!
//! A process-local publish/subscribe registry. Publishers and subscribers
//! agree only on a topic string; the bus knows nothing about what the
//! values mean.
//!
//! # Features
//!
//! - **Exact Routing**: Topics match by string equality, no wildcards
//! - **Synchronous Dispatch**: `publish` runs every handler inline, in
//!   registration order, before returning
//! - **Fault Isolation**: A handler that returns an error or panics does not
//!   stop the handlers after it
//! - **RAII Subscriptions**: Dropping a [`Subscription`] unsubscribes
//! - **Reentrancy**: Handlers may publish or subscribe from inside dispatch
//!
//! # Quick Start
//!
//! ```rust
//! use event_bus::EventBus;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! let bus = EventBus::<i64>::new();
//! let last = Arc::new(AtomicI64::new(0));
//!
//! let seen = Arc::clone(&last);
//! let _subscription = bus.subscribe("zone1:light:status", move |value: &i64| {
//!     seen.store(*value, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! let report = bus.publish("zone1:light:status", 1);
//! assert_eq!(report.delivered, 1);
//! assert_eq!(last.load(Ordering::SeqCst), 1);
//! ```
//!
//! # Architecture
//!
//! ```text
//! EventBus<V>
//!     │
//!     └── Arc<Inner<V>>
//!             │
//!             ├── topics: RwLock<HashMap<String, Vec<Subscriber<V>>>>
//!             │
//!             └── next_id: AtomicU64
//!
//! Subscription ── Weak<Inner<V>> ── removes its entry on drop
//! ```

pub mod bus;
pub mod error;
pub mod subscription;

pub use bus::{DispatchFailure, DispatchReport, EventBus};
pub use error::{HandlerError, HandlerResult};
pub use subscription::{Subscription, SubscriptionId};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bus::{DispatchReport, EventBus};
    pub use crate::error::{HandlerError, HandlerResult};
    pub use crate::subscription::Subscription;
}
