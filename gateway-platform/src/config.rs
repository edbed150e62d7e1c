//! Declarative device configuration
//!
//! Devices are configured in groups keyed by device type. Each entry carries
//! an `id`, a display `name`, and any handler-specific fields, which are kept
//! verbatim:
//!
//! ```json
//! {
//!   "WindowCovering": [
//!     { "id": 5, "name": "Office Shade" },
//!     { "id": "lobby-1", "name": "Lobby Shade", "topic": "shade7" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{PlatformError, Result};

/// Device id as written in the configuration, numeric or string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceId {
    Number(i64),
    Text(String),
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Number(n) => write!(f, "{}", n),
            DeviceId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for DeviceId {
    fn from(n: i64) -> Self {
        DeviceId::Number(n)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        DeviceId::Text(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        DeviceId::Text(s)
    }
}

/// One configured device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: DeviceId,

    #[serde(default)]
    pub name: String,

    /// Handler-specific fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceEntry {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// Add a handler-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Name shown by the host; falls back to `"<type> <id>"` when unnamed
    pub fn display_name(&self, device_type: &str) -> String {
        if self.name.trim().is_empty() {
            format!("{} {}", device_type, self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Entries for one device type, in configuration order
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGroup {
    pub device_type: String,
    pub entries: Vec<DeviceEntry>,
}

/// All configured devices, grouped by device type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceConfig {
    groups: Vec<DeviceGroup>,
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the group for `device_type`
    pub fn with_group(mut self, device_type: impl Into<String>, entries: Vec<DeviceEntry>) -> Self {
        self.insert_group(device_type, entries);
        self
    }

    pub fn insert_group(&mut self, device_type: impl Into<String>, entries: Vec<DeviceEntry>) {
        let device_type = device_type.into();
        match self.groups.iter_mut().find(|g| g.device_type == device_type) {
            Some(group) => group.entries = entries,
            None => self.groups.push(DeviceGroup {
                device_type,
                entries,
            }),
        }
    }

    /// Build from a configuration object; every array-valued key is a group
    ///
    /// Non-array keys (name, host, port, ...) are ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            PlatformError::Configuration("device configuration must be an object".to_string())
        })?;

        let mut config = Self::new();
        for (device_type, group) in object {
            let Some(items) = group.as_array() else {
                continue;
            };

            let entries = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    DeviceEntry::deserialize(item).map_err(|e| PlatformError::InvalidDevice {
                        device_type: device_type.clone(),
                        reason: format!("entry {}: {}", index, e),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            config.insert_group(device_type.clone(), entries);
        }

        Ok(config)
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    /// Entries for `device_type`, or `None` if the group is absent
    pub fn group(&self, device_type: &str) -> Option<&[DeviceEntry]> {
        self.groups
            .iter()
            .find(|g| g.device_type == device_type)
            .map(|g| g.entries.as_slice())
    }

    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.device_type.as_str())
    }

    /// Total number of entries across all groups
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.device_count() == 0
    }
}
