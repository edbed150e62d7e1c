//! Stable accessory identity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::DeviceId;

/// Namespace for accessory UUIDs generated by this bridge
pub const BRIDGE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c3a_8b4e_5a7f_9c0d_1e2f_3a4b_5c6d);

/// Deterministic identity of a bridged accessory
///
/// Generated as a v5 UUID from the device type and id, so the same device
/// keeps its identity across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessoryIdentity(Uuid);

impl AccessoryIdentity {
    /// Identity for an arbitrary seed string
    pub fn generate(seed: &str) -> Self {
        Self(Uuid::new_v5(&BRIDGE_NAMESPACE, seed.as_bytes()))
    }

    /// Identity for a configured device
    pub fn for_device(device_type: &str, id: &DeviceId) -> Self {
        Self::generate(&seed_for(device_type, id))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Seed string for a device: the device type followed by its id
pub fn seed_for(device_type: &str, id: &DeviceId) -> String {
    format!("{}{}", device_type, id)
}

impl fmt::Display for AccessoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessoryIdentity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for AccessoryIdentity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_deterministic() {
        let a = AccessoryIdentity::for_device("WindowCovering", &DeviceId::from(5));
        let b = AccessoryIdentity::for_device("WindowCovering", &DeviceId::from(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_is_scoped_by_device_type() {
        let covering = AccessoryIdentity::for_device("WindowCovering", &DeviceId::from(5));
        let thermostat = AccessoryIdentity::for_device("Thermostat", &DeviceId::from(5));
        assert_ne!(covering, thermostat);
    }

    #[test]
    fn test_numeric_and_string_ids_share_identity() {
        let numeric = AccessoryIdentity::for_device("Light", &DeviceId::from(12));
        let text = AccessoryIdentity::for_device("Light", &DeviceId::from("12"));
        assert_eq!(numeric, text);
    }

    #[test]
    fn test_identity_is_v5() {
        let identity = AccessoryIdentity::generate("WindowCovering5");
        assert_eq!(identity.as_uuid().get_version_num(), 5);
    }

    #[test]
    fn test_display_parse_round_trip() {
        let identity = AccessoryIdentity::generate("Light1");
        let parsed: AccessoryIdentity = identity.to_string().parse().unwrap();
        assert_eq!(parsed, identity);
    }
}
