//! Reconciliation of configured devices against persisted accessories
//!
//! Reconciliation is a pure computation: given the configured devices and
//! the identities the host already knows, it decides which accessories to
//! create, which to update and which are orphans. Applying the plan is the
//! platform's job.
//!
//! ```text
//!   configured ──► identity ──┬── persisted? ──► to_update
//!                             └── otherwise  ──► to_create
//!
//!   persisted − active ──────────────────────► to_delete
//! ```

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::{DeviceConfig, DeviceEntry};
use crate::identity::{seed_for, AccessoryIdentity};

/// A configured device with its computed identity
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDevice {
    pub identity: AccessoryIdentity,
    pub device_type: String,
    pub entry: DeviceEntry,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Configured devices with no persisted accessory, in configuration order
    pub to_create: Vec<PlannedDevice>,
    /// Configured devices that already have an accessory, in configuration order
    pub to_update: Vec<PlannedDevice>,
    /// Persisted accessories no longer configured, in persisted order
    pub to_delete: Vec<AccessoryIdentity>,
    /// Every identity touched by this pass
    pub active: HashSet<AccessoryIdentity>,
    /// Entries skipped because their identity was already active
    pub duplicates: Vec<PlannedDevice>,
}

impl ReconcilePlan {
    /// True when applying the plan would neither create nor delete anything
    pub fn is_stable(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Accumulates a [`ReconcilePlan`] one device-type group at a time
#[derive(Debug)]
pub struct Reconciler {
    persisted: Vec<AccessoryIdentity>,
    persisted_set: HashSet<AccessoryIdentity>,
    plan: ReconcilePlan,
}

impl Reconciler {
    pub fn new<I>(persisted: I) -> Self
    where
        I: IntoIterator<Item = AccessoryIdentity>,
    {
        let mut persisted_set = HashSet::new();
        let persisted = persisted
            .into_iter()
            .filter(|identity| persisted_set.insert(*identity))
            .collect();

        Self {
            persisted,
            persisted_set,
            plan: ReconcilePlan::default(),
        }
    }

    /// Plan one device-type group
    ///
    /// `identify` maps a seed (device type followed by id) to an identity.
    /// An absent group is skipped. An entry whose identity is already active
    /// in this pass is recorded as a duplicate and otherwise ignored.
    pub fn reconcile_group<F>(
        &mut self,
        device_type: &str,
        entries: Option<&[DeviceEntry]>,
        mut identify: F,
    ) where
        F: FnMut(&str) -> AccessoryIdentity,
    {
        let Some(entries) = entries else {
            debug!(%device_type, "No devices configured for type");
            return;
        };

        for entry in entries {
            let identity = identify(&seed_for(device_type, &entry.id));
            let planned = PlannedDevice {
                identity,
                device_type: device_type.to_string(),
                entry: entry.clone(),
            };

            if !self.plan.active.insert(identity) {
                warn!(
                    %device_type,
                    id = %entry.id,
                    "Duplicate device in configuration, keeping the first entry"
                );
                self.plan.duplicates.push(planned);
                continue;
            }

            if self.persisted_set.contains(&identity) {
                self.plan.to_update.push(planned);
            } else {
                self.plan.to_create.push(planned);
            }
        }
    }

    /// Identities touched so far
    pub fn active(&self) -> &HashSet<AccessoryIdentity> {
        &self.plan.active
    }

    /// Compute orphans and return the finished plan
    pub fn finish(mut self) -> ReconcilePlan {
        let active = &self.plan.active;
        self.plan.to_delete = self
            .persisted
            .iter()
            .filter(|identity| !active.contains(identity))
            .copied()
            .collect();
        self.plan
    }
}

/// Reconcile every group in `config` against `persisted`
///
/// Uses [`AccessoryIdentity::generate`] for identities.
pub fn reconcile(config: &DeviceConfig, persisted: &[AccessoryIdentity]) -> ReconcilePlan {
    let mut reconciler = Reconciler::new(persisted.iter().copied());
    for group in config.groups() {
        reconciler.reconcile_group(
            &group.device_type,
            Some(&group.entries),
            AccessoryIdentity::generate,
        );
    }
    reconciler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceId;

    fn id(device_type: &str, id: i64) -> AccessoryIdentity {
        AccessoryIdentity::for_device(device_type, &DeviceId::from(id))
    }

    fn shades(ids: &[i64]) -> DeviceConfig {
        DeviceConfig::new().with_group(
            "WindowCovering",
            ids.iter()
                .map(|i| DeviceEntry::new(*i, format!("Shade {}", i)))
                .collect(),
        )
    }

    #[test]
    fn test_fresh_install_creates_everything() {
        let plan = reconcile(&shades(&[1, 2]), &[]);
        assert_eq!(plan.to_create.len(), 2);
        assert!(plan.to_update.is_empty());
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.to_create[0].identity, id("WindowCovering", 1));
    }

    #[test]
    fn test_orphans_are_persisted_minus_active() {
        let a = id("WindowCovering", 1);
        let b = id("WindowCovering", 2);
        let c = id("WindowCovering", 3);

        let plan = reconcile(&shades(&[1, 3]), &[a, b, c]);

        assert_eq!(plan.to_delete, vec![b]);
        assert_eq!(plan.active, HashSet::from([a, c]));
        assert_eq!(plan.to_update.len(), 2);
        assert!(plan.to_create.is_empty());
    }

    #[test]
    fn test_absent_group_is_skipped() {
        let mut reconciler = Reconciler::new(Vec::new());
        reconciler.reconcile_group("Thermostat", None, AccessoryIdentity::generate);
        let plan = reconciler.finish();
        assert_eq!(plan, ReconcilePlan::default());
    }

    #[test]
    fn test_active_accumulates_across_groups() {
        let light = id("Light", 1);
        let shade = id("WindowCovering", 1);

        let mut reconciler = Reconciler::new(vec![light, shade]);
        reconciler.reconcile_group(
            "Light",
            Some(&[DeviceEntry::new(1, "Lamp")]),
            AccessoryIdentity::generate,
        );
        assert_eq!(reconciler.active().len(), 1);
        reconciler.reconcile_group(
            "WindowCovering",
            Some(&[DeviceEntry::new(1, "Shade")]),
            AccessoryIdentity::generate,
        );

        let plan = reconciler.finish();
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.to_update.len(), 2);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let config = DeviceConfig::new().with_group(
            "WindowCovering",
            vec![DeviceEntry::new(1, "First"), DeviceEntry::new(1, "Second")],
        );

        let plan = reconcile(&config, &[]);

        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].entry.name, "First");
        assert_eq!(plan.duplicates.len(), 1);
        assert_eq!(plan.duplicates[0].entry.name, "Second");
    }

    #[test]
    fn test_custom_identity_function() {
        let mut seeds = Vec::new();
        let mut reconciler = Reconciler::new(Vec::new());
        reconciler.reconcile_group("Light", Some(&[DeviceEntry::new("a", "A")]), |seed| {
            seeds.push(seed.to_string());
            AccessoryIdentity::generate(seed)
        });
        assert_eq!(seeds, vec!["Lighta"]);
    }

    #[test]
    fn test_second_pass_is_stable() {
        let config = shades(&[1, 2, 3]);
        let first = reconcile(&config, &[]);
        let persisted: Vec<_> = first.to_create.iter().map(|p| p.identity).collect();

        let second = reconcile(&config, &persisted);
        assert!(second.is_stable());
        assert_eq!(second.to_update.len(), 3);
    }
}
