//! Device handler boundary and the factory registry
//!
//! A handler drives one accessory: it subscribes to the status topics its
//! device publishes and sends commands back through the [`CommandSender`].
//! Handlers are built by a [`HandlerFactory`] chosen by device type, so
//! adding a device type means registering one more factory.
//!
//! # Example
//!
//! ```
//! use gateway_platform::handler::{
//!     AccessoryHandler, HandlerContext, HandlerFactory, HandlerRegistry,
//! };
//! use gateway_platform::{AccessoryHandle, AccessoryIdentity, HandlerError};
//!
//! struct Doorbell {
//!     identity: AccessoryIdentity,
//! }
//!
//! impl AccessoryHandler for Doorbell {
//!     fn device_type(&self) -> &str { "Doorbell" }
//!     fn identity(&self) -> AccessoryIdentity { self.identity }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! struct DoorbellFactory;
//!
//! impl HandlerFactory for DoorbellFactory {
//!     fn device_type(&self) -> &str { "Doorbell" }
//!
//!     fn create(
//!         &self,
//!         _context: &HandlerContext,
//!         accessory: &AccessoryHandle,
//!     ) -> Result<Box<dyn AccessoryHandler>, HandlerError> {
//!         Ok(Box::new(Doorbell { identity: accessory.read().identity }))
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Box::new(DoorbellFactory));
//! assert!(registry.get("Doorbell").is_some());
//! ```

use event_bus::{EventBus, HandlerError};
use gateway_protocol::StatusValue;
use std::any::Any;
use std::collections::HashMap;
use tracing::debug;

use crate::accessory::AccessoryHandle;
use crate::accessories::WindowCoveringFactory;
use crate::command::CommandSender;
use crate::identity::AccessoryIdentity;

/// Resources a handler needs while it runs
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Status events, keyed by topic
    pub bus: EventBus<StatusValue>,
    /// Outbound commands
    pub commands: CommandSender,
}

impl HandlerContext {
    pub fn new(bus: EventBus<StatusValue>, commands: CommandSender) -> Self {
        Self { bus, commands }
    }
}

/// A live handler bound to one accessory
///
/// Dropping the handler must release its bus subscriptions.
pub trait AccessoryHandler: Send {
    fn device_type(&self) -> &str;

    fn identity(&self) -> AccessoryIdentity;

    /// Get a reference to the handler as Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Builds handlers for one device type
pub trait HandlerFactory: Send + Sync {
    /// Device-type tag this factory handles
    fn device_type(&self) -> &str;

    fn create(
        &self,
        context: &HandlerContext,
        accessory: &AccessoryHandle,
    ) -> Result<Box<dyn AccessoryHandler>, HandlerError>;
}

/// Device-type tag to factory lookup
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, Box<dyn HandlerFactory>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WindowCoveringFactory));
        registry
    }

    /// Register a factory, returning the one it replaces
    pub fn register(
        &mut self,
        factory: Box<dyn HandlerFactory>,
    ) -> Option<Box<dyn HandlerFactory>> {
        let device_type = factory.device_type().to_string();
        debug!(%device_type, "Registered handler factory");
        self.factories.insert(device_type, factory)
    }

    pub fn get(&self, device_type: &str) -> Option<&dyn HandlerFactory> {
        self.factories.get(device_type).map(|f| f.as_ref())
    }

    pub fn contains(&self, device_type: &str) -> bool {
        self.factories.contains_key(device_type)
    }

    /// Registered device types, sorted
    pub fn device_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("device_types", &self.device_types())
            .finish()
    }
}
