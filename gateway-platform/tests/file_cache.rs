//! FileAccessoryCache persistence across restarts

use std::sync::Arc;

use event_bus::EventBus;
use gateway_platform::{
    AccessoryIdentity, BridgePlatform, CommandSender, DeviceConfig, DeviceEntry, FileAccessoryCache,
    HandlerRegistry, HostPlatform, PlatformAccessory,
};
use gateway_protocol::ProtocolConfig;
use gateway_transport::RecordingTransport;

fn start(cache: Arc<FileAccessoryCache>, devices: DeviceConfig) -> BridgePlatform {
    let mut platform = BridgePlatform::new(
        cache.clone(),
        EventBus::new(),
        CommandSender::new(Arc::new(RecordingTransport::new())),
        HandlerRegistry::with_defaults(),
        devices,
        ProtocolConfig::default(),
    )
    .unwrap();

    for accessory in cache.load() {
        platform.configure_accessory(accessory);
    }
    platform
}

#[test]
fn test_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("accessories.json");

    let cache = FileAccessoryCache::open(&path).unwrap();
    let identity = AccessoryIdentity::generate("WindowCovering5");
    let mut accessory = PlatformAccessory::new("Shade", identity);
    let entry = DeviceEntry::new(5, "Shade").with_field("topic", "s5");
    accessory.set_device("WindowCovering", &entry);
    cache.register_accessories(&[accessory.clone()]).unwrap();

    let reopened = FileAccessoryCache::open(&path).unwrap();
    assert_eq!(reopened.load(), vec![accessory]);
}

#[test]
fn test_restart_restores_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accessories.json");
    let devices = DeviceConfig::new().with_group(
        "WindowCovering",
        vec![DeviceEntry::new(1, "Kitchen"), DeviceEntry::new(2, "Office")],
    );

    let first = {
        let cache = Arc::new(FileAccessoryCache::open(&path).unwrap());
        let mut platform = start(cache, devices.clone());
        platform.on_ready().unwrap()
    };
    assert_eq!(first.created.len(), 2);

    // Second boot with one device removed from configuration
    let devices =
        DeviceConfig::new().with_group("WindowCovering", vec![DeviceEntry::new(1, "Kitchen")]);
    let cache = Arc::new(FileAccessoryCache::open(&path).unwrap());
    let mut platform = start(cache.clone(), devices);
    let second = platform.on_ready().unwrap();

    assert!(second.created.is_empty());
    assert_eq!(second.updated, vec![first.created[0]]);
    assert_eq!(second.removed, vec![first.created[1]]);

    let stored = FileAccessoryCache::open(&path).unwrap().load();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].display_name, "Kitchen");
    assert_eq!(stored[0].device_type(), Some("WindowCovering"));
}
