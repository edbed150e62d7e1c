//! The bridge platform controller
//!
//! [`BridgePlatform`] ties the pieces together: it receives cached
//! accessories from the host, reconciles them against the device
//! configuration when the host is ready, owns the resulting handlers, and
//! feeds transport chunks through the decoder onto the event bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  chunks  ┌───────────────┐ publish ┌──────────┐
//! │  Transport   │ ───────► │ StreamDecoder │ ──────► │ EventBus │
//! └──────────────┘          └───────────────┘         └────┬─────┘
//!        ▲                                                 │ status
//!        │ write            ┌───────────────┐              ▼
//!        └───────────────── │ CommandSender │ ◄──── device handlers
//!                           └───────────────┘
//! ```

use event_bus::EventBus;
use gateway_protocol::{ProtocolConfig, StatusValue, StreamDecoder};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::accessory::{AccessoryHandle, PlatformAccessory};
use crate::command::CommandSender;
use crate::config::{DeviceConfig, DeviceId};
use crate::error::{PlatformError, Result};
use crate::handler::{AccessoryHandler, HandlerContext, HandlerRegistry};
use crate::host::HostPlatform;
use crate::identity::AccessoryIdentity;
use crate::reconcile::{PlannedDevice, Reconciler};

/// A device that could not be brought up during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
    pub identity: AccessoryIdentity,
    pub device_type: String,
    pub reason: String,
}

/// Outcome of a discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub created: Vec<AccessoryIdentity>,
    pub updated: Vec<AccessoryIdentity>,
    pub removed: Vec<AccessoryIdentity>,
    pub failed: Vec<DiscoveryFailure>,
    /// Accessories whose device type has no registered handler
    pub unhandled: Vec<AccessoryIdentity>,
    /// Configuration entries skipped as duplicates
    pub duplicates: Vec<(String, DeviceId)>,
}

impl DiscoveryReport {
    /// True when nothing failed and every accessory has a handler
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unhandled.is_empty() && self.duplicates.is_empty()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} removed, {} failed, {} unhandled, {} duplicates",
            self.created.len(),
            self.updated.len(),
            self.removed.len(),
            self.failed.len(),
            self.unhandled.len(),
            self.duplicates.len()
        )
    }
}

/// Platform controller for one gateway
pub struct BridgePlatform {
    host: Arc<dyn HostPlatform>,
    context: HandlerContext,
    registry: HandlerRegistry,
    devices: DeviceConfig,
    decoder: StreamDecoder,
    accessories: Vec<AccessoryHandle>,
    handlers: HashMap<AccessoryIdentity, Box<dyn AccessoryHandler>>,
    launched: bool,
}

impl BridgePlatform {
    /// Create the platform; nothing is registered until [`on_ready`](Self::on_ready)
    pub fn new(
        host: Arc<dyn HostPlatform>,
        bus: EventBus<StatusValue>,
        commands: CommandSender,
        registry: HandlerRegistry,
        devices: DeviceConfig,
        protocol: ProtocolConfig,
    ) -> Result<Self> {
        protocol.validate().map_err(PlatformError::Configuration)?;

        for device_type in devices.device_types() {
            if !registry.contains(device_type) {
                warn!(%device_type, "No handler registered for configured device type");
            }
        }

        debug!(devices = devices.device_count(), "Finished initializing platform");

        Ok(Self {
            host,
            context: HandlerContext::new(bus, commands),
            registry,
            devices,
            decoder: StreamDecoder::new(protocol),
            accessories: Vec::new(),
            handlers: HashMap::new(),
            launched: false,
        })
    }

    /// Restore an accessory from the host cache
    ///
    /// Called by the host once per cached accessory before [`on_ready`](Self::on_ready).
    pub fn configure_accessory(&mut self, accessory: PlatformAccessory) {
        info!(
            name = %accessory.display_name,
            identity = %accessory.identity,
            "Loading accessory from cache"
        );
        match self.find(&accessory.identity) {
            Some(existing) => *existing.write() = accessory,
            None => self.accessories.push(accessory.into_handle()),
        }
    }

    /// Host finished restoring cached accessories
    ///
    /// Runs discovery the first time only; later calls return `None`.
    pub fn on_ready(&mut self) -> Option<DiscoveryReport> {
        if self.launched {
            debug!("Platform already launched, skipping discovery");
            return None;
        }
        self.launched = true;
        debug!("Executed on_ready callback");
        Some(self.discover_devices())
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Reconcile configuration against known accessories and rebuild handlers
    pub fn discover_devices(&mut self) -> DiscoveryReport {
        // Old handlers hold bus subscriptions; release them before rebinding
        self.handlers.clear();

        let persisted: Vec<AccessoryIdentity> =
            self.accessories.iter().map(|a| a.read().identity).collect();

        let mut reconciler = Reconciler::new(persisted);
        let host = Arc::clone(&self.host);
        for group in self.devices.groups() {
            reconciler.reconcile_group(&group.device_type, Some(&group.entries), |seed| {
                host.generate_identity(seed)
            });
        }
        let plan = reconciler.finish();

        let mut report = DiscoveryReport {
            duplicates: plan
                .duplicates
                .iter()
                .map(|d| (d.device_type.clone(), d.entry.id.clone()))
                .collect(),
            ..Default::default()
        };

        for planned in &plan.to_update {
            self.update_accessory(planned, &mut report);
        }
        for planned in &plan.to_create {
            self.create_accessory(planned, &mut report);
        }
        for identity in &plan.to_delete {
            self.remove_accessory(identity, &mut report);
        }

        info!(%report, "Device discovery finished");
        report
    }

    fn update_accessory(&mut self, planned: &PlannedDevice, report: &mut DiscoveryReport) {
        let Some(handle) = self.find(&planned.identity) else {
            return;
        };

        let mut updated = handle.read().clone();
        info!(name = %updated.display_name, "Restoring existing accessory from cache");
        updated.display_name = planned.entry.display_name(&planned.device_type);
        updated.set_device(&planned.device_type, &planned.entry);

        if let Err(e) = self.host.update_accessories(std::slice::from_ref(&updated)) {
            warn!(identity = %planned.identity, error = %e, "Failed to update accessory");
            report.failed.push(failure(planned, e.to_string()));
            return;
        }
        *handle.write() = updated;

        if self.bind_handler(planned, &handle, report) {
            report.updated.push(planned.identity);
        }
    }

    fn create_accessory(&mut self, planned: &PlannedDevice, report: &mut DiscoveryReport) {
        let display_name = planned.entry.display_name(&planned.device_type);
        info!(name = %display_name, "Adding new accessory");

        let mut accessory = self.host.create_accessory(&display_name, planned.identity);
        accessory.set_device(&planned.device_type, &planned.entry);

        if let Err(e) = self.host.register_accessories(&[accessory.clone()]) {
            warn!(identity = %planned.identity, error = %e, "Failed to register accessory");
            report.failed.push(failure(planned, e.to_string()));
            return;
        }

        let handle = accessory.into_handle();
        self.accessories.push(Arc::clone(&handle));

        if self.bind_handler(planned, &handle, report) {
            report.created.push(planned.identity);
        }
    }

    fn remove_accessory(&mut self, identity: &AccessoryIdentity, report: &mut DiscoveryReport) {
        let Some(position) = self.position(identity) else {
            return;
        };

        let snapshot = self.accessories[position].read().clone();
        info!(name = %snapshot.display_name, %identity, "Deleting accessory");

        match self.host.unregister_accessories(&[snapshot.clone()]) {
            Ok(()) => {
                self.accessories.remove(position);
                report.removed.push(*identity);
            }
            Err(e) => {
                warn!(%identity, error = %e, "Failed to unregister accessory");
                report.failed.push(DiscoveryFailure {
                    identity: *identity,
                    device_type: snapshot.device_type().unwrap_or_default().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Instantiate the handler for `planned`; false if the factory failed
    fn bind_handler(
        &mut self,
        planned: &PlannedDevice,
        handle: &AccessoryHandle,
        report: &mut DiscoveryReport,
    ) -> bool {
        let Some(factory) = self.registry.get(&planned.device_type) else {
            warn!(
                device_type = %planned.device_type,
                id = %planned.entry.id,
                "Unrecognized device type, accessory has no handler"
            );
            report.unhandled.push(planned.identity);
            return true;
        };

        match factory.create(&self.context, handle) {
            Ok(handler) => {
                self.handlers.insert(planned.identity, handler);
                true
            }
            Err(e) => {
                warn!(identity = %planned.identity, error = %e, "Failed to create handler");
                report.failed.push(failure(planned, e.to_string()));
                false
            }
        }
    }

    /// Decode a transport chunk and publish every complete message
    ///
    /// Returns the number of messages published.
    pub fn handle_data(&mut self, chunk: &str) -> usize {
        let messages = self.decoder.push(chunk);
        self.publish_all(messages)
    }

    /// Decode and publish whatever partial message is buffered
    ///
    /// Call at the end of a stream, when no continuation will arrive.
    pub fn flush_data(&mut self) -> usize {
        let messages = self.decoder.flush();
        self.publish_all(messages)
    }

    /// Drop any buffered partial message without publishing it
    pub fn reset_decoder(&mut self) {
        if !self.decoder.residual().is_empty() {
            debug!(residual = self.decoder.residual(), "Discarding partial message");
        }
        self.decoder.reset();
    }

    fn publish_all(&self, messages: Vec<gateway_protocol::StatusMessage>) -> usize {
        let count = messages.len();
        for message in messages {
            debug!(topic = %message.topic, value = %message.value, "Dispatching status");
            self.context.bus.publish(message.topic.as_str(), message.value);
        }
        count
    }

    /// Send a raw command string to the gateway
    pub fn send_data(&self, command: &str) {
        self.context.commands.send(command);
    }

    /// Snapshot of every known accessory
    pub fn accessories(&self) -> Vec<PlatformAccessory> {
        self.accessories.iter().map(|a| a.read().clone()).collect()
    }

    pub fn accessory(&self, identity: &AccessoryIdentity) -> Option<AccessoryHandle> {
        self.find(identity)
    }

    pub fn handler(&self, identity: &AccessoryIdentity) -> Option<&dyn AccessoryHandler> {
        self.handlers.get(identity).map(|h| h.as_ref())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn bus(&self) -> &EventBus<StatusValue> {
        &self.context.bus
    }

    pub fn devices(&self) -> &DeviceConfig {
        &self.devices
    }

    /// Replace the device configuration; takes effect on the next discovery
    pub fn set_devices(&mut self, devices: DeviceConfig) {
        self.devices = devices;
    }

    fn find(&self, identity: &AccessoryIdentity) -> Option<AccessoryHandle> {
        self.accessories
            .iter()
            .find(|a| a.read().identity == *identity)
            .cloned()
    }

    fn position(&self, identity: &AccessoryIdentity) -> Option<usize> {
        self.accessories
            .iter()
            .position(|a| a.read().identity == *identity)
    }
}

impl fmt::Debug for BridgePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgePlatform")
            .field("accessories", &self.accessories.len())
            .field("handlers", &self.handlers.len())
            .field("registry", &self.registry)
            .field("launched", &self.launched)
            .finish()
    }
}

fn failure(planned: &PlannedDevice, reason: String) -> DiscoveryFailure {
    DiscoveryFailure {
        identity: planned.identity,
        device_type: planned.device_type.clone(),
        reason,
    }
}
