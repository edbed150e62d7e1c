//! Accessory platform for the control gateway bridge
//!
//! This crate turns a declarative device configuration into live accessories
//! on a smart-home host and keeps them in step with the gateway:
//!
//! - **Reconciliation**: configured devices are matched against the
//!   accessories the host has cached, by a deterministic
//!   [`AccessoryIdentity`]. New devices are created, known ones updated in
//!   place, and accessories no longer configured are removed.
//! - **Handlers**: each accessory gets a handler chosen by device type
//!   through the [`HandlerRegistry`]. Handlers subscribe to status topics on
//!   the event bus and send commands back through the [`CommandSender`].
//! - **Dispatch**: [`BridgePlatform::handle_data`] decodes transport chunks
//!   and publishes each status message on the bus.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use event_bus::EventBus;
//! use gateway_platform::{
//!     BridgePlatform, CommandSender, DeviceConfig, DeviceEntry, FileAccessoryCache,
//!     HandlerRegistry,
//! };
//! use gateway_protocol::ProtocolConfig;
//! # fn transport() -> Arc<dyn gateway_transport::Transport> { unimplemented!() }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(FileAccessoryCache::open("accessories.json")?);
//! let devices = DeviceConfig::new()
//!     .with_group("WindowCovering", vec![DeviceEntry::new(5, "Office Shade")]);
//!
//! let mut platform = BridgePlatform::new(
//!     cache.clone(),
//!     EventBus::new(),
//!     CommandSender::new(transport()),
//!     HandlerRegistry::with_defaults(),
//!     devices,
//!     ProtocolConfig::default(),
//! )?;
//!
//! for accessory in cache.load() {
//!     platform.configure_accessory(accessory);
//! }
//! if let Some(report) = platform.on_ready() {
//!     println!("discovery: {}", report);
//! }
//!
//! platform.handle_data("5:WindowCovering:CurrentPosition:40*");
//! # Ok(())
//! # }
//! ```

pub mod accessories;
pub mod accessory;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod host;
pub mod identity;
pub mod platform;
pub mod reconcile;

pub use accessory::{AccessoryHandle, PlatformAccessory};
pub use command::CommandSender;
pub use config::{DeviceConfig, DeviceEntry, DeviceGroup, DeviceId};
pub use error::{HostError, PlatformError, Result};
pub use event_bus::HandlerError;
pub use handler::{AccessoryHandler, HandlerContext, HandlerFactory, HandlerRegistry};
pub use host::{FileAccessoryCache, HostPlatform};
#[cfg(any(test, feature = "test-support"))]
pub use host::{HostCall, MemoryHost};
pub use identity::AccessoryIdentity;
pub use platform::{BridgePlatform, DiscoveryFailure, DiscoveryReport};
pub use reconcile::{reconcile, PlannedDevice, ReconcilePlan, Reconciler};

/// Commonly used types
pub mod prelude {
    pub use crate::accessories::{WindowCovering, WindowCoveringFactory};
    pub use crate::{
        AccessoryHandler, AccessoryIdentity, BridgePlatform, CommandSender, DeviceConfig,
        DeviceEntry, DiscoveryReport, FileAccessoryCache, HandlerFactory, HandlerRegistry,
        HostPlatform, PlatformAccessory,
    };
}
