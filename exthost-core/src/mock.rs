//! Mock sandbox and surface for testing
//!
//! [`MockConnector`] hands out [`MockChannel`]s that record what the host
//! posts and let a test speak for the plugin. Connections can be
//! parked mid-load to observe pending states. [`RecordingSurface`] records
//! injections and can hold `host_mounted` until told otherwise.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use exthost_api::{
    Disposer, HostMessage, HostSurface, InboundSender, PluginMessage, SandboxChannel,
    SandboxConnector, SandboxError, SandboxSpec, SurfaceError, ThemeDescriptor, UiDescriptor,
};
use tokio::sync::watch;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A fake sandbox connection
pub struct MockChannel {
    spec: SandboxSpec,
    posted: Mutex<Vec<HostMessage>>,
    destroyed: AtomicBool,
    inbound: InboundSender,
}

impl MockChannel {
    pub fn spec(&self) -> &SandboxSpec {
        &self.spec
    }

    /// Messages posted so far, in order
    pub fn posted(&self) -> Vec<HostMessage> {
        lock(&self.posted).clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Send a message to the host as if from the plugin
    pub fn send(&self, message: PluginMessage) -> Result<(), SandboxError> {
        self.inbound.send(message).map_err(|_| SandboxError::Closed)
    }
}

#[async_trait]
impl SandboxChannel for MockChannel {
    fn post(&self, message: HostMessage) -> Result<(), SandboxError> {
        if self.is_destroyed() {
            return Err(SandboxError::Closed);
        }
        lock(&self.posted).push(message);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), SandboxError> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector that records every connection
pub struct MockConnector {
    channels: Mutex<Vec<Arc<MockChannel>>>,
    failing: Mutex<HashSet<String>>,
    open: watch::Sender<bool>,
}

impl Default for MockConnector {
    fn default() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            channels: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            open,
        }
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park every `connect` until [`release`](Self::release)
    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    /// Refuse connections to this entry
    pub fn fail_on(&self, entry: impl Into<String>) {
        lock(&self.failing).insert(entry.into());
    }

    /// Every channel handed out, in connect order
    pub fn channels(&self) -> Vec<Arc<MockChannel>> {
        lock(&self.channels).clone()
    }

    /// The most recent channel for plugin `id`
    pub fn channel(&self, id: &str) -> Option<Arc<MockChannel>> {
        lock(&self.channels)
            .iter()
            .rev()
            .find(|channel| channel.spec.id == id)
            .cloned()
    }

    pub fn connect_count(&self) -> usize {
        lock(&self.channels).len()
    }
}

#[async_trait]
impl SandboxConnector for MockConnector {
    async fn connect(
        &self,
        spec: &SandboxSpec,
        inbound: InboundSender,
    ) -> Result<Arc<dyn SandboxChannel>, SandboxError> {
        let mut open = self.open.subscribe();
        let _ = open.wait_for(|open| *open).await;

        if lock(&self.failing).contains(&spec.entry) {
            return Err(SandboxError::Connect(format!("refused {}", spec.entry)));
        }

        let channel = Arc::new(MockChannel {
            spec: spec.clone(),
            posted: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            inbound,
        });
        lock(&self.channels).push(Arc::clone(&channel));
        Ok(channel)
    }
}

/// Host surface that records what it was asked to inject
pub struct RecordingSurface {
    themes: Mutex<Vec<Option<ThemeDescriptor>>>,
    styles: Arc<Mutex<Vec<String>>>,
    uis: Arc<Mutex<Vec<String>>>,
    mounted: watch::Sender<bool>,
}

impl RecordingSurface {
    /// A surface whose host is already mounted
    pub fn new() -> Self {
        Self::with_mounted(true)
    }

    /// A surface that holds UI injection until [`mount`](Self::mount)
    pub fn unmounted() -> Self {
        Self::with_mounted(false)
    }

    fn with_mounted(mounted: bool) -> Self {
        let (mounted, _) = watch::channel(mounted);
        Self {
            themes: Mutex::new(Vec::new()),
            styles: Arc::new(Mutex::new(Vec::new())),
            uis: Arc::new(Mutex::new(Vec::new())),
            mounted,
        }
    }

    pub fn mount(&self) {
        self.mounted.send_replace(true);
    }

    /// Every theme injection, in order
    pub fn themes(&self) -> Vec<Option<ThemeDescriptor>> {
        lock(&self.themes).clone()
    }

    /// Plugins with a live injected style
    pub fn styles(&self) -> Vec<String> {
        lock(&self.styles).clone()
    }

    /// Plugins with live injected UI
    pub fn uis(&self) -> Vec<String> {
        lock(&self.uis).clone()
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Record `plugin` in `live` and return a disposer that removes it again
fn tracked(label: &str, live: &Arc<Mutex<Vec<String>>>, plugin: &str) -> Disposer {
    lock(live).push(plugin.to_string());
    let live = Arc::clone(live);
    let plugin = plugin.to_string();
    Disposer::from_fn(format!("{}:{}", label, plugin), move || {
        let mut live = lock(&live);
        if let Some(pos) = live.iter().position(|p| *p == plugin) {
            live.remove(pos);
        }
    })
}

#[async_trait]
impl HostSurface for RecordingSurface {
    async fn inject_theme(&self, theme: Option<&ThemeDescriptor>) -> Result<(), SurfaceError> {
        lock(&self.themes).push(theme.cloned());
        Ok(())
    }

    async fn inject_style(&self, plugin: &str, _css: &str) -> Result<Disposer, SurfaceError> {
        Ok(tracked("style", &self.styles, plugin))
    }

    async fn inject_ui(&self, plugin: &str, _ui: &UiDescriptor) -> Result<Disposer, SurfaceError> {
        Ok(tracked("ui", &self.uis, plugin))
    }

    async fn host_mounted(&self) {
        let mut rx = self.mounted.subscribe();
        let _ = rx.wait_for(|mounted| *mounted).await;
    }
}
