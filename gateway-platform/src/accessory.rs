//! Host-side accessory record

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::DeviceEntry;
use crate::identity::AccessoryIdentity;

const CONTEXT_DEVICE: &str = "device";
const CONTEXT_DEVICE_TYPE: &str = "deviceType";

/// An accessory as the host platform knows it
///
/// `context` is an opaque JSON object persisted by the host. The bridge
/// stores the device entry and its device type there so a restored
/// accessory can be matched back to configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAccessory {
    pub identity: AccessoryIdentity,
    pub display_name: String,
    #[serde(default)]
    pub context: Value,
}

/// Shared handle to an accessory; handlers hold one for the accessory they drive
pub type AccessoryHandle = Arc<RwLock<PlatformAccessory>>;

impl PlatformAccessory {
    pub fn new(display_name: impl Into<String>, identity: AccessoryIdentity) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            context: Value::Object(Default::default()),
        }
    }

    /// Store the device entry this accessory represents
    pub fn set_device(&mut self, device_type: &str, entry: &DeviceEntry) {
        let device = serde_json::to_value(entry).unwrap_or(Value::Null);
        if !self.context.is_object() {
            self.context = json!({});
        }
        if let Some(context) = self.context.as_object_mut() {
            context.insert(CONTEXT_DEVICE.to_string(), device);
            context.insert(
                CONTEXT_DEVICE_TYPE.to_string(),
                Value::String(device_type.to_string()),
            );
        }
    }

    /// Device entry stored in the context, if any
    pub fn device(&self) -> Option<DeviceEntry> {
        self.context
            .get(CONTEXT_DEVICE)
            .and_then(|v| DeviceEntry::deserialize(v).ok())
    }

    pub fn device_type(&self) -> Option<&str> {
        self.context.get(CONTEXT_DEVICE_TYPE).and_then(Value::as_str)
    }

    pub fn into_handle(self) -> AccessoryHandle {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_device_round_trip() {
        let identity = AccessoryIdentity::generate("WindowCovering5");
        let mut accessory = PlatformAccessory::new("Shade", identity);
        assert!(accessory.device().is_none());
        assert!(accessory.device_type().is_none());

        let entry = DeviceEntry::new(5, "Shade").with_field("topic", "shade7");
        accessory.set_device("WindowCovering", &entry);

        assert_eq!(accessory.device(), Some(entry));
        assert_eq!(accessory.device_type(), Some("WindowCovering"));
    }

    #[test]
    fn test_set_device_overwrites_non_object_context() {
        let mut accessory = PlatformAccessory::new("Shade", AccessoryIdentity::generate("x"));
        accessory.context = Value::Null;
        accessory.set_device("Light", &DeviceEntry::new(1, "Lamp"));
        assert_eq!(accessory.device_type(), Some("Light"));
    }

    #[test]
    fn test_deserialize_without_context() {
        let identity = AccessoryIdentity::generate("Light1");
        let value = json!({"identity": identity.to_string(), "display_name": "Lamp"});
        let accessory: PlatformAccessory = serde_json::from_value(value).unwrap();
        assert_eq!(accessory.identity, identity);
        assert!(accessory.context.is_null());
    }
}
