//! End-to-end bridge run against a local gateway socket

use std::time::Duration;

use gateway_bridge::{Bridge, BridgeConfig};
use gateway_platform::accessories::WindowCovering;
use gateway_platform::{AccessoryIdentity, DeviceId, FileAccessoryCache};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn config(port: u16) -> BridgeConfig {
    BridgeConfig::from_json(&format!(
        r#"{{
            "name": "Test Gateway",
            "host": "127.0.0.1",
            "port": {port},
            "reconnect_delay_ms": 50,
            "WindowCovering": [{{"id": 5, "name": "Office Shade"}}]
        }}"#
    ))
    .unwrap()
}

fn shade() -> AccessoryIdentity {
    AccessoryIdentity::for_device("WindowCovering", &DeviceId::from(5))
}

fn current_position(bridge: &Bridge) -> Option<i64> {
    bridge
        .platform()
        .handler(&shade())
        .and_then(|h| h.as_any().downcast_ref::<WindowCovering>())
        .and_then(|c| c.state().current_position.map(i64::from))
}

/// Dispatch events until the shade reports `position`
async fn wait_for_position(bridge: &mut Bridge, position: i64) {
    timeout(WAIT, async {
        while current_position(bridge) != Some(position) {
            bridge.next_event().await.unwrap();
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_bridge_dispatches_and_commands() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("accessories.json");

    let (mut bridge, report) = Bridge::start(&config(port), &cache_path).await.unwrap();
    assert_eq!(report.created, vec![shade()]);

    let (mut gateway, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    gateway
        .write_all(b"5:WindowCovering:CurrentPosition:30*")
        .await
        .unwrap();

    let mut published = 0;
    while published == 0 {
        published = timeout(WAIT, bridge.next_event()).await.unwrap().unwrap();
    }
    assert_eq!(published, 1);
    assert_eq!(bridge.messages(), 1);

    let covering = bridge
        .platform()
        .handler(&shade())
        .and_then(|h| h.as_any().downcast_ref::<WindowCovering>())
        .unwrap();
    assert_eq!(covering.state().current_position, Some(30));

    timeout(WAIT, async {
        while !bridge.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    covering.set_target_position(80);

    let expected = b"5:WindowCovering:SetTargetPosition:80*";
    let mut received = Vec::new();
    let mut buf = [0u8; 64];
    while received.len() < expected.len() {
        let n = timeout(WAIT, gateway.read(&mut buf)).await.unwrap().unwrap();
        assert!(n > 0);
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, expected);

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_restart_reuses_cached_accessories() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("accessories.json");

    let (bridge, first) = Bridge::start(&config(port), &cache_path).await.unwrap();
    assert_eq!(first.created.len(), 1);
    bridge.shutdown().await;

    let (bridge, second) = Bridge::start(&config(port), &cache_path).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated, vec![shade()]);
    bridge.shutdown().await;

    let stored = FileAccessoryCache::open(&cache_path).unwrap().load();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].display_name, "Office Shade");
}

#[tokio::test]
async fn test_run_until_stops_on_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();

    let (bridge, _) = Bridge::start(&config(port), &dir.path().join("cache.json"))
        .await
        .unwrap();

    let messages = timeout(WAIT, bridge.run_until(async {}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(messages, 0);
}

#[tokio::test]
async fn test_partial_message_does_not_survive_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();

    let (mut bridge, _) = Bridge::start(&config(port), &dir.path().join("cache.json"))
        .await
        .unwrap();

    let (mut first, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    first.write_all(b"5:WindowCovering:CurrentPos").await.unwrap();
    drop(first);

    let (mut second, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    second
        .write_all(b"5:WindowCovering:CurrentPosition:40*")
        .await
        .unwrap();

    // Glued to the stale fragment this would land on "5:WindowCovering:CurrentPos5"
    wait_for_position(&mut bridge, 40).await;

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_unterminated_message_is_flushed_on_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();

    let (mut bridge, _) = Bridge::start(&config(port), &dir.path().join("cache.json"))
        .await
        .unwrap();

    let (mut gateway, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    gateway
        .write_all(b"5:WindowCovering:CurrentPosition:30")
        .await
        .unwrap();
    drop(gateway);

    wait_for_position(&mut bridge, 30).await;
    assert_eq!(bridge.messages(), 1);

    bridge.shutdown().await;
}
