//! PluginInstance lifecycle tests outside a registry

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use exthost_api::{Disposer, HostMessage};
use exthost_core::plugins::{LoadBatch, PreferenceStore};
use exthost_core::{
    EventEmitter, HostContext, InstanceEvent, MemoryHostBridge, MockConnector, PluginInstance,
    PluginOptions, PluginStatus, ReadyBarrier, RecordingSurface, ThemeRegistry,
};

fn context(connector: Arc<MockConnector>) -> HostContext {
    let bridge = Arc::new(MemoryHostBridge::new());
    let surface = Arc::new(RecordingSurface::new());
    let preferences = Arc::new(PreferenceStore::new(bridge.clone()));
    HostContext {
        bridge,
        connector,
        surface: surface.clone(),
        themes: Arc::new(ThemeRegistry::new(surface, preferences, EventEmitter::new(16))),
        event_capacity: 16,
    }
}

fn bundled() -> PluginOptions {
    PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1")
}

async fn wait_for_status(instance: &PluginInstance, status: PluginStatus) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while instance.status() != status {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("status not reached in time");
}

#[tokio::test]
async fn ready_waits_for_batch_barrier() {
    let connector = Arc::new(MockConnector::new());
    let instance = PluginInstance::new(bundled(), context(connector.clone()));
    let batch = LoadBatch {
        ready: ReadyBarrier::new(),
        registered: HashSet::new(),
    };

    instance.load(Some(&batch)).await;
    tokio::task::yield_now().await;

    let channel = connector.channel("p1").unwrap();
    assert_eq!(instance.status(), PluginStatus::Loaded);
    assert!(channel.posted().is_empty());

    batch.ready.resolve();
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while channel.posted().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(channel.posted(), vec![HostMessage::Ready]);
}

#[tokio::test]
async fn disposers_run_exactly_once() {
    let instance = PluginInstance::new(bundled(), context(Arc::new(MockConnector::new())));
    instance.load(None).await;
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    instance.add_disposer(Disposer::from_fn("count", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    instance.unload(false).await;
    instance.unload(false).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(instance.status(), PluginStatus::Unloaded);
}

#[tokio::test]
async fn unload_emits_before_and_after_events() {
    let instance = PluginInstance::new(bundled(), context(Arc::new(MockConnector::new())));
    instance.load(None).await;
    let mut events = instance.subscribe();

    instance.unload(false).await;

    assert_eq!(events.recv().await.unwrap(), InstanceEvent::BeforeUnload);
    assert_eq!(events.recv().await.unwrap(), InstanceEvent::Unloaded);
}

#[tokio::test]
async fn reload_retries_failed_load() {
    let connector = Arc::new(MockConnector::new());
    connector.fail_on("/p1/index.js");
    let instance = PluginInstance::new(bundled(), context(connector));

    instance.load(None).await;
    assert_eq!(instance.status(), PluginStatus::Error);
    assert!(instance.info().error.is_some());

    instance.reload().await;
    assert_eq!(instance.status(), PluginStatus::Error);
}

#[tokio::test]
async fn info_snapshot_serializes() {
    let instance = PluginInstance::new(
        bundled().with_name("Journals Calendar"),
        context(Arc::new(MockConnector::new())),
    );
    instance.load(None).await;

    let info = serde_json::to_value(instance.info()).unwrap();

    assert_eq!(info["id"], "p1");
    assert_eq!(info["status"], "loaded");
    assert_eq!(info["connected"], true);
    assert_eq!(info["settings_key"], "journals_calendar_p1");
    assert_eq!(instance.debug_tag(), "[Journals Calendar #p1]");
}

#[tokio::test]
async fn lifecycle_calls_while_loading_are_ignored() {
    let connector = Arc::new(MockConnector::new());
    connector.hold();
    let instance = PluginInstance::new(bundled(), context(connector.clone()));
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    instance.add_disposer(Disposer::from_fn("count", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let loading = Arc::clone(&instance);
    let first = tokio::spawn(async move { loading.load(None).await });
    wait_for_status(&instance, PluginStatus::Loading).await;

    instance.load(None).await;
    instance.unload(false).await;
    instance.reload().await;
    assert_eq!(instance.status(), PluginStatus::Loading);
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    connector.release();
    first.await.unwrap();

    assert_eq!(instance.status(), PluginStatus::Loaded);
    assert_eq!(connector.connect_count(), 1);

    instance.unload(false).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lifecycle_calls_while_unloading_are_ignored() {
    let connector = Arc::new(MockConnector::new());
    let instance = PluginInstance::new(bundled(), context(connector.clone()));
    instance.load(None).await;

    let gate = Arc::new(tokio::sync::Notify::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let (held, counter) = (Arc::clone(&gate), Arc::clone(&runs));
    instance.add_disposer(Disposer::new("slow", move || async move {
        held.notified().await;
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    let unloading = Arc::clone(&instance);
    let first = tokio::spawn(async move { unloading.unload(false).await });
    wait_for_status(&instance, PluginStatus::Unloading).await;

    instance.unload(false).await;
    instance.load(None).await;
    assert_eq!(instance.status(), PluginStatus::Unloading);

    gate.notify_one();
    first.await.unwrap();

    assert_eq!(instance.status(), PluginStatus::Unloaded);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(instance.disposer_count(), 0);
}
