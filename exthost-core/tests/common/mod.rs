//! Shared fixtures for registry integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use exthost_core::{HostConfig, HostEvent, MemoryHostBridge, MockConnector, PluginRegistry, RecordingSurface};
use tokio::sync::broadcast;

pub struct Harness {
    pub registry: PluginRegistry,
    pub bridge: Arc<MemoryHostBridge>,
    pub connector: Arc<MockConnector>,
    pub surface: Arc<RecordingSurface>,
}

pub fn harness() -> Harness {
    harness_with(RecordingSurface::new())
}

pub fn harness_with(surface: RecordingSurface) -> Harness {
    harness_configured(HostConfig::rooted_at("/config"), surface)
}

pub fn harness_configured(config: HostConfig, surface: RecordingSurface) -> Harness {
    let bridge = Arc::new(MemoryHostBridge::new());
    let connector = Arc::new(MockConnector::new());
    let surface = Arc::new(surface);
    let registry = PluginRegistry::new(
        config,
        bridge.clone(),
        connector.clone(),
        surface.clone(),
    );
    Harness {
        registry,
        bridge,
        connector,
        surface,
    }
}

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Names of every event currently queued on `rx`
pub fn drain_names(rx: &mut broadcast::Receiver<HostEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    names
}
