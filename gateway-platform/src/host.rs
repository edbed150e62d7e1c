//! Host platform boundary and accessory persistence
//!
//! The host platform owns the persisted accessory set. At startup it hands
//! every cached accessory to [`BridgePlatform::configure_accessory`] and then
//! calls [`BridgePlatform::on_ready`]. During reconciliation the bridge asks
//! the host to register, update and unregister accessories through
//! [`HostPlatform`].
//!
//! [`BridgePlatform::configure_accessory`]: crate::BridgePlatform::configure_accessory
//! [`BridgePlatform::on_ready`]: crate::BridgePlatform::on_ready

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::accessory::PlatformAccessory;
use crate::error::HostError;
use crate::identity::AccessoryIdentity;

/// Accessory operations provided by the host platform
pub trait HostPlatform: Send + Sync {
    /// Deterministic identity for a seed string
    fn generate_identity(&self, seed: &str) -> AccessoryIdentity {
        AccessoryIdentity::generate(seed)
    }

    /// Construct a new, unregistered accessory
    fn create_accessory(
        &self,
        display_name: &str,
        identity: AccessoryIdentity,
    ) -> PlatformAccessory {
        PlatformAccessory::new(display_name, identity)
    }

    fn register_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError>;

    fn update_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError>;

    fn unregister_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError>;
}

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    accessories: Vec<PlatformAccessory>,
}

/// Host that persists registered accessories to a JSON file
///
/// Every register, update and unregister rewrites the file, so the cache on
/// disk always matches the last successful operation.
#[derive(Debug)]
pub struct FileAccessoryCache {
    path: PathBuf,
    accessories: Mutex<Vec<PlatformAccessory>>,
}

impl FileAccessoryCache {
    /// Open the cache at `path`, reading any accessories already stored there
    ///
    /// A missing file is an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HostError> {
        let path = path.into();
        let accessories = match fs::read_to_string(&path) {
            Ok(text) => {
                let file: CacheFile = serde_json::from_str(&text)?;
                debug!(
                    path = %path.display(),
                    version = file.version,
                    count = file.accessories.len(),
                    "Read accessory cache"
                );
                file.accessories
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            accessories: Mutex::new(accessories),
        })
    }

    /// Default cache location under the user data directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("gateway-bridge").join("accessories.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accessories currently stored, in registration order
    pub fn load(&self) -> Vec<PlatformAccessory> {
        self.accessories.lock().clone()
    }

    fn persist(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = CacheFile {
            version: CACHE_VERSION,
            accessories: accessories.to_vec(),
        };
        let text = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply `change` to a copy of the stored set, persist, then commit
    fn modify<F>(&self, change: F) -> Result<(), HostError>
    where
        F: FnOnce(&mut Vec<PlatformAccessory>),
    {
        let mut stored = self.accessories.lock();
        let mut next = stored.clone();
        change(&mut next);
        self.persist(&next)?;
        *stored = next;
        Ok(())
    }
}

impl HostPlatform for FileAccessoryCache {
    fn register_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError> {
        self.modify(|stored| {
            for accessory in accessories {
                match stored.iter_mut().find(|a| a.identity == accessory.identity) {
                    Some(existing) => *existing = accessory.clone(),
                    None => stored.push(accessory.clone()),
                }
            }
        })?;
        info!(count = accessories.len(), "Registered accessories");
        Ok(())
    }

    fn update_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError> {
        let missing = {
            let stored = self.accessories.lock();
            accessories
                .iter()
                .find(|a| !stored.iter().any(|s| s.identity == a.identity))
                .map(|a| a.identity)
        };
        if let Some(identity) = missing {
            return Err(HostError::Rejected {
                operation: "update",
                identity: identity.to_string(),
                reason: "accessory is not registered".to_string(),
            });
        }

        self.modify(|stored| {
            for accessory in accessories {
                if let Some(existing) = stored
                    .iter_mut()
                    .find(|a| a.identity == accessory.identity)
                {
                    *existing = accessory.clone();
                }
            }
        })
    }

    fn unregister_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError> {
        self.modify(|stored| {
            stored.retain(|a| !accessories.iter().any(|r| r.identity == a.identity));
        })?;
        info!(count = accessories.len(), "Unregistered accessories");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::{HostCall, MemoryHost};

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// One call made against a [`MemoryHost`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum HostCall {
        Register(Vec<AccessoryIdentity>),
        Update(Vec<AccessoryIdentity>),
        Unregister(Vec<AccessoryIdentity>),
    }

    #[derive(Debug, Default)]
    struct State {
        registered: Vec<PlatformAccessory>,
        calls: Vec<HostCall>,
        rejected: HashSet<AccessoryIdentity>,
    }

    /// In-memory host that records every call
    ///
    /// Clones share state, so a test can keep one clone while the platform
    /// owns another.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryHost {
        state: Arc<Mutex<State>>,
    }

    impl MemoryHost {
        pub fn new() -> Self {
            Self::default()
        }

        /// Start with `accessories` already registered
        pub fn with_registered(accessories: Vec<PlatformAccessory>) -> Self {
            let host = Self::new();
            host.state.lock().registered = accessories;
            host
        }

        /// Make every operation on `identity` fail
        pub fn reject(&self, identity: AccessoryIdentity) {
            self.state.lock().rejected.insert(identity);
        }

        pub fn registered(&self) -> Vec<PlatformAccessory> {
            self.state.lock().registered.clone()
        }

        pub fn calls(&self) -> Vec<HostCall> {
            self.state.lock().calls.clone()
        }

        pub fn clear_calls(&self) {
            self.state.lock().calls.clear();
        }

        fn check(
            state: &State,
            operation: &'static str,
            accessories: &[PlatformAccessory],
        ) -> Result<(), HostError> {
            match accessories.iter().find(|a| state.rejected.contains(&a.identity)) {
                Some(a) => Err(HostError::Rejected {
                    operation,
                    identity: a.identity.to_string(),
                    reason: "rejected by test host".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    fn identities(accessories: &[PlatformAccessory]) -> Vec<AccessoryIdentity> {
        accessories.iter().map(|a| a.identity).collect()
    }

    impl HostPlatform for MemoryHost {
        fn register_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError> {
            let mut state = self.state.lock();
            state.calls.push(HostCall::Register(identities(accessories)));
            Self::check(&state, "registration", accessories)?;
            state.registered.extend(accessories.iter().cloned());
            Ok(())
        }

        fn update_accessories(&self, accessories: &[PlatformAccessory]) -> Result<(), HostError> {
            let mut state = self.state.lock();
            state.calls.push(HostCall::Update(identities(accessories)));
            Self::check(&state, "update", accessories)?;
            for accessory in accessories {
                if let Some(existing) = state
                    .registered
                    .iter_mut()
                    .find(|a| a.identity == accessory.identity)
                {
                    *existing = accessory.clone();
                }
            }
            Ok(())
        }

        fn unregister_accessories(
            &self,
            accessories: &[PlatformAccessory],
        ) -> Result<(), HostError> {
            let mut state = self.state.lock();
            state.calls.push(HostCall::Unregister(identities(accessories)));
            Self::check(&state, "unregistration", accessories)?;
            state
                .registered
                .retain(|a| !accessories.iter().any(|r| r.identity == a.identity));
            Ok(())
        }
    }
}
