//! PluginInstance - one plugin's lifecycle
//!
//! ```text
//!            load                 ok
//! Unloaded ───────▶ Loading ─────────────▶ Loaded
//!     ▲                │ err                  │ unload
//!     │                ▼                      ▼
//!     │              Error               Unloading
//!     └───────────────────────────────────────┘
//! ```
//!
//! `Loading` and `Unloading` are pending: lifecycle calls made while
//! pending are ignored. Everything a load sets up registers a [`Disposer`];
//! unload drains them in order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use exthost_api::{
    AppCall, Disposer, HostBridge, HostMessage, HostSurface, PluginId, PluginMessage,
    SandboxChannel, SandboxConnector, SandboxSpec, ThemeDescriptor, UiDescriptor,
};
use heck::ToSnakeCase;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::barrier::ReadyBarrier;
use super::batch::LoadBatch;
use super::manifest::{MANIFEST_FILE, PackageManifest};
use super::options::PluginOptions;
use super::settings::SettingsStore;
use super::themes::ThemeRegistry;
use crate::error::PluginError;
use crate::events::{EventEmitter, InstanceEvent};

/// Lifecycle state of a plugin instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Unloading,
    Error,
}

impl PluginStatus {
    /// Transitional states during which lifecycle calls are ignored
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Loading | Self::Unloading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Unloading => "unloading",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collaborators shared by every instance of one registry
#[derive(Clone)]
pub struct HostContext {
    pub bridge: Arc<dyn HostBridge>,
    pub connector: Arc<dyn SandboxConnector>,
    pub surface: Arc<dyn HostSurface>,
    pub themes: Arc<ThemeRegistry>,
    pub event_capacity: usize,
}

/// Serializable snapshot of an instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInfo {
    pub id: PluginId,
    #[serde(flatten)]
    pub options: PluginOptions,
    pub status: PluginStatus,
    pub error: Option<String>,
    pub disabled: bool,
    pub connected: bool,
    pub settings_key: String,
}

#[derive(Default)]
struct InstanceState {
    id: PluginId,
    options: PluginOptions,
    status: PluginStatus,
    last_error: Option<PluginError>,
    local_root: Option<String>,
    package_themes: Vec<ThemeDescriptor>,
    settings: Option<Arc<SettingsStore>>,
    settings_key: Option<String>,
    channel: Option<Arc<dyn SandboxChannel>>,
    /// Bumped on every connect so late `Ready` posts can detect staleness
    connection: u64,
    ready: Option<ReadyBarrier>,
    disposers: Vec<Disposer>,
}

/// A single plugin and everything it has contributed to the host
pub struct PluginInstance {
    state: Mutex<InstanceState>,
    ctx: HostContext,
    events: EventEmitter<InstanceEvent>,
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PluginInstance")
            .field("id", &state.id)
            .field("status", &state.status)
            .field("disposers", &state.disposers.len())
            .finish_non_exhaustive()
    }
}

/// Replace anything that is not ASCII alphanumeric with `_`, lowercased
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl PluginInstance {
    /// Create an unloaded instance. Identity is `options.key` when given,
    /// otherwise a fresh UUID until a manifest declares one.
    pub fn new(options: PluginOptions, ctx: HostContext) -> Arc<Self> {
        let id = options
            .key
            .clone()
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let events = EventEmitter::new(ctx.event_capacity);

        Arc::new(Self {
            state: Mutex::new(InstanceState {
                id,
                options,
                ..Default::default()
            }),
            ctx,
            events,
        })
    }

    fn state(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> PluginId {
        self.state().id.clone()
    }

    pub fn options(&self) -> PluginOptions {
        self.state().options.clone()
    }

    pub fn status(&self) -> PluginStatus {
        self.state().status
    }

    pub fn is_pending(&self) -> bool {
        self.status().is_pending()
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == PluginStatus::Loaded
    }

    /// Error recorded by the most recent failed load
    pub fn last_error(&self) -> Option<PluginError> {
        self.state().last_error.clone()
    }

    /// Resolved package root, falling back to the source location
    pub fn local_root(&self) -> Option<String> {
        let state = self.state();
        state
            .local_root
            .clone()
            .or_else(|| state.options.source.clone())
    }

    pub fn settings(&self) -> Option<Arc<SettingsStore>> {
        self.state().settings.clone()
    }

    /// Whether the bound settings mark the plugin disabled
    pub fn disabled(&self) -> bool {
        self.settings().is_some_and(|settings| settings.disabled())
    }

    /// Live sandbox channel, if connected
    pub fn channel(&self) -> Option<Arc<dyn SandboxChannel>> {
        self.state().channel.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().channel.is_some()
    }

    pub fn disposer_count(&self) -> usize {
        self.state().disposers.len()
    }

    /// Key under which the bridge persists this plugin's settings
    pub fn settings_key(&self) -> String {
        let state = self.state();
        match &state.settings_key {
            Some(key) => key.clone(),
            None => format!("{}_{}", sanitize(&state.options.name), state.id),
        }
    }

    /// Short label for log lines
    pub fn debug_tag(&self) -> String {
        let state = self.state();
        let name = if state.options.name.is_empty() {
            "<unnamed>"
        } else {
            state.options.name.as_str()
        };
        format!("[{} #{}]", name, state.id)
    }

    pub fn info(&self) -> PluginInfo {
        let settings_key = self.settings_key();
        let state = self.state();
        PluginInfo {
            id: state.id.clone(),
            options: state.options.clone(),
            status: state.status,
            error: state.last_error.as_ref().map(ToString::to_string),
            disabled: state.settings.as_ref().is_some_and(|s| s.disabled()),
            connected: state.channel.is_some(),
            settings_key,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InstanceEvent> {
        self.events.subscribe()
    }

    /// Register a cleanup action to run on the next unload
    pub fn add_disposer(&self, disposer: Disposer) {
        self.state().disposers.push(disposer);
    }

    /// Post a message to the sandbox
    pub fn post(&self, message: HostMessage) -> Result<(), PluginError> {
        let channel = self
            .channel()
            .ok_or_else(|| PluginError::Sandbox(format!("{} is not connected", self.debug_tag())))?;
        channel.post(message)?;
        Ok(())
    }

    /// Load the plugin. Failures are recorded in [`last_error`](Self::last_error)
    /// and leave the instance in [`PluginStatus::Error`].
    ///
    /// `batch` is set when loading as part of a registration batch: the
    /// instance then refuses identities already registered and defers its
    /// `Ready` message until the batch completes.
    pub async fn load(self: &Arc<Self>, batch: Option<&LoadBatch>) {
        {
            let mut state = self.state();
            if state.status.is_pending() {
                tracing::debug!(plugin = %state.id, status = %state.status, "Load ignored, plugin is pending");
                return;
            }
            state.status = PluginStatus::Loading;
            state.last_error = None;
            if let Some(batch) = batch {
                state.ready = Some(batch.ready.clone());
            }
        }

        let started = Instant::now();
        match self.try_load(batch).await {
            Ok(()) => {
                self.state().status = PluginStatus::Loaded;
                tracing::info!(
                    plugin = %self.debug_tag(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Plugin loaded"
                );
            }
            Err(e) => {
                tracing::error!(plugin = %self.debug_tag(), error = %e, "Failed to load plugin");
                self.drain_disposers().await;
                let mut state = self.state();
                state.status = PluginStatus::Error;
                state.last_error = Some(e);
            }
        }
    }

    async fn try_load(self: &Arc<Self>, batch: Option<&LoadBatch>) -> Result<(), PluginError> {
        let needs_manifest = self.state().options.entry.is_none();
        if needs_manifest {
            self.prepare_package().await?;
        }

        let id = self.id();
        if batch.is_some_and(|batch| batch.registered.contains(&id)) {
            return Err(PluginError::ExistingImport { id });
        }

        if self.settings().is_none() {
            self.bind_settings().await;
        }

        if self.disabled() {
            tracing::debug!(plugin = %self.debug_tag(), "Plugin disabled, skipping sandbox");
            return Ok(());
        }

        let package_themes = self.state().package_themes.clone();
        for theme in package_themes {
            self.contribute_theme(theme);
        }

        let entry = self.state().options.entry.clone();
        match entry {
            Some(entry) => self.connect_sandbox(entry, batch).await,
            None => {
                tracing::debug!(plugin = %self.debug_tag(), "Theme-only package, no sandbox");
                Ok(())
            }
        }
    }

    /// Read the manifest from `source` and fill in options, root and identity
    async fn prepare_package(&self) -> Result<(), PluginError> {
        let source = self
            .state()
            .options
            .source
            .clone()
            .ok_or_else(|| PluginError::IllegalPackage("Can not resolve package location".to_string()))?;

        let raw = self
            .ctx
            .bridge
            .load_plugin_manifest(&source)
            .await
            .map_err(|e| PluginError::IllegalPackage(e.to_string()))?
            .ok_or_else(|| {
                PluginError::IllegalPackage(format!("Missing package config {}/{}", source, MANIFEST_FILE))
            })?;
        let mut manifest = PackageManifest::parse(&raw)?;

        let generated = {
            let mut state = self.state();
            manifest.apply_to(&mut state.options, &source);
            state.local_root = Some(source.clone());
            state.package_themes = manifest.themes(&source);
            match manifest.declared_id() {
                Some(id) => {
                    state.id = id.to_string();
                    None
                }
                None => Some(state.id.clone()),
            }
        };

        // Persist a generated identity so the next load reuses it
        if let Some(id) = generated {
            manifest.assign_id(&id);
            let saved = match manifest.to_value() {
                Ok(value) => self
                    .ctx
                    .bridge
                    .save_plugin_manifest(&source, &value)
                    .await
                    .map_err(PluginError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = saved {
                tracing::warn!(plugin = %id, error = %e, "Failed to write back package identity");
            }
        }

        Ok(())
    }

    async fn bind_settings(self: &Arc<Self>) {
        let key = self.settings_key();
        let persisted = match self.ctx.bridge.load_plugin_settings(&key).await {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!(plugin = %self.debug_tag(), error = %e, "Failed to load settings, using defaults");
                None
            }
        };

        let store = Arc::new(SettingsStore::new(persisted, self.ctx.event_capacity));
        self.spawn_settings_observer(&store, key.clone());
        let mut state = self.state();
        state.settings = Some(store);
        state.settings_key = Some(key);
    }

    /// Persist every settings change and turn `disabled` flips into load/unload.
    ///
    /// The observer compares the store's current `disabled` value with the
    /// last one it acted on, so a flip buried in a lagged window still lands.
    fn spawn_settings_observer(self: &Arc<Self>, store: &Arc<SettingsStore>, key: String) {
        let mut changes = store.subscribe();
        let mut applied = store.disabled();
        let store = Arc::downgrade(store);
        let weak = Arc::downgrade(self);
        let bridge = Arc::clone(&self.ctx.bridge);

        tokio::spawn(async move {
            loop {
                let lagged = match changes.recv().await {
                    Ok(change) => {
                        if let Err(e) = bridge.save_plugin_settings(&key, &change.new).await {
                            tracing::warn!(settings = %key, error = %e, "Failed to persist settings");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(settings = %key, skipped, "Settings observer lagged");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let (Some(instance), Some(settings)) = (weak.upgrade(), store.upgrade()) else {
                    break;
                };
                if lagged {
                    let snapshot = settings.snapshot();
                    if let Err(e) = bridge.save_plugin_settings(&key, &snapshot).await {
                        tracing::warn!(settings = %key, error = %e, "Failed to persist settings");
                    }
                }

                let disabled = settings.disabled();
                if disabled != applied {
                    applied = disabled;
                    instance.apply_disabled_transition(disabled).await;
                }
            }
        });
    }

    /// Unload when `disabled` became true, load when it became false
    async fn apply_disabled_transition(self: &Arc<Self>, disabled: bool) {
        if disabled {
            tracing::info!(plugin = %self.debug_tag(), "Plugin disabled");
            self.unload(false).await;
        } else {
            tracing::info!(plugin = %self.debug_tag(), "Plugin enabled");
            self.load(None).await;
        }
    }

    async fn connect_sandbox(
        self: &Arc<Self>,
        entry: String,
        batch: Option<&LoadBatch>,
    ) -> Result<(), PluginError> {
        let spec = {
            let state = self.state();
            SandboxSpec {
                id: state.id.clone(),
                name: state.options.name.clone(),
                entry,
                mode: state.options.mode,
                local_root: state
                    .local_root
                    .clone()
                    .or_else(|| state.options.source.clone()),
            }
        };

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let channel = self.ctx.connector.connect(&spec, inbound_tx).await?;
        let pump = self.spawn_inbound_pump(inbound_rx);

        let connection = {
            let mut state = self.state();
            state.connection += 1;
            state.channel = Some(Arc::clone(&channel));
            state.connection
        };
        tracing::debug!(plugin = %spec.id, entry = %spec.entry, mode = spec.mode.as_str(), "Sandbox connected");

        match batch {
            Some(batch) => {
                let ready = batch.ready.clone();
                let weak = Arc::downgrade(self);
                tokio::spawn(async move {
                    ready.wait().await;
                    if let Some(instance) = weak.upgrade() {
                        instance.post_ready(connection);
                    }
                });
            }
            None => self.post_ready(connection),
        }

        let weak = Arc::downgrade(self);
        self.add_disposer(Disposer::new("sandbox", move || async move {
            pump.abort();
            if let Some(instance) = weak.upgrade() {
                instance.state().channel = None;
            }
            channel.destroy().await?;
            Ok(())
        }));

        Ok(())
    }

    fn post_ready(&self, connection: u64) {
        let channel = {
            let state = self.state();
            if state.connection != connection {
                return;
            }
            state.channel.clone()
        };
        let Some(channel) = channel else {
            return;
        };
        if let Err(e) = channel.post(HostMessage::Ready) {
            tracing::warn!(plugin = %self.debug_tag(), error = %e, "Failed to post ready");
        }
    }

    fn spawn_inbound_pump(self: &Arc<Self>, mut inbound: mpsc::UnboundedReceiver<PluginMessage>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let Some(instance) = weak.upgrade() else {
                    break;
                };
                instance.handle_message(message).await;
            }
        })
    }

    /// Handle a message sent by the plugin's sandbox
    pub async fn handle_message(self: &Arc<Self>, message: PluginMessage) {
        match message {
            PluginMessage::SettingsUpdate(patch) => {
                if let Some(settings) = self.settings() {
                    settings.merge(patch);
                }
            }
            PluginMessage::ProvideTheme(theme) => self.contribute_theme(theme),
            PluginMessage::ProvideStyle(css) => self.provide_style(css).await,
            PluginMessage::ProvideUi(ui) => self.provide_ui(ui),
            PluginMessage::AppCall(call) => self.forward_app_call(call).await,
        }
    }

    /// Add a theme to the registry; the first contribution arms removal on unload
    pub fn contribute_theme(&self, mut theme: ThemeDescriptor) {
        let id = self.id();
        theme.pid.get_or_insert_with(|| id.clone());

        if self.ctx.themes.register_theme(&id, theme) {
            let themes = Arc::clone(&self.ctx.themes);
            self.add_disposer(Disposer::from_fn("themes", move || {
                themes.unregister_theme(&id);
            }));
        }
    }

    async fn provide_style(&self, css: String) {
        if css.trim().is_empty() {
            return;
        }
        let id = self.id();
        match self.ctx.surface.inject_style(&id, &css).await {
            Ok(disposer) => self.add_disposer(disposer),
            Err(e) => tracing::warn!(plugin = %self.debug_tag(), error = %e, "Failed to inject style"),
        }
    }

    /// Inject UI once the batch is ready and the host is mounted
    fn provide_ui(self: &Arc<Self>, ui: UiDescriptor) {
        let weak = Arc::downgrade(self);
        let ready = self.state().ready.clone();
        let surface = Arc::clone(&self.ctx.surface);

        tokio::spawn(async move {
            if let Some(ready) = ready {
                ready.wait().await;
            }
            surface.host_mounted().await;

            let Some(instance) = weak.upgrade() else {
                return;
            };
            let id = instance.id();
            let disposer = match surface.inject_ui(&id, &ui).await {
                Ok(disposer) => disposer,
                Err(e) => {
                    tracing::warn!(plugin = %id, error = %e, "Failed to inject UI");
                    return;
                }
            };

            if instance.is_loaded() {
                instance.add_disposer(disposer);
            } else if let Err(e) = disposer.dispose().await {
                tracing::warn!(plugin = %id, error = %e, "Failed to remove stale UI");
            }
        });
    }

    async fn forward_app_call(&self, call: AppCall) {
        let method = call.method.to_snake_case();
        let result = self.ctx.bridge.invoke(&method, call.args).await;
        if let Err(e) = &result {
            tracing::debug!(plugin = %self.debug_tag(), method = %method, error = %e, "App call failed");
        }

        let Some(id) = call.sync else {
            return;
        };
        let reply = match result {
            Ok(result) => HostMessage::Sync {
                id,
                result,
                error: None,
            },
            Err(e) => HostMessage::Sync {
                id,
                result: Value::Null,
                error: Some(e.to_string()),
            },
        };
        if let Err(e) = self.post(reply) {
            tracing::warn!(plugin = %self.debug_tag(), method = %method, error = %e, "Failed to reply to app call");
        }
    }

    /// Unload the plugin, running every disposer.
    ///
    /// With `remove_files` set the plugin's persisted files are deleted
    /// afterwards through the bridge.
    pub async fn unload(self: &Arc<Self>, remove_files: bool) {
        {
            let mut state = self.state();
            if state.status.is_pending() {
                tracing::debug!(plugin = %state.id, status = %state.status, "Unload ignored, plugin is pending");
                return;
            }
            state.status = PluginStatus::Unloading;
        }

        self.events.emit(InstanceEvent::BeforeUnload);
        let disposed = self.drain_disposers().await;
        self.events.emit(InstanceEvent::Unloaded);
        self.state().status = PluginStatus::Unloaded;
        tracing::info!(plugin = %self.debug_tag(), disposed, "Plugin unloaded");

        if remove_files {
            self.remove_files().await;
        }
    }

    async fn remove_files(&self) {
        let key = self.settings_key();
        let source = self.state().options.source.clone();
        if let Err(e) = self
            .ctx
            .bridge
            .remove_plugin_files(source.as_deref(), &key)
            .await
        {
            tracing::warn!(plugin = %self.debug_tag(), error = %e, "Failed to remove plugin files");
        }
    }

    /// Unload then load again. Ignored while pending.
    pub async fn reload(self: &Arc<Self>) {
        if self.is_pending() {
            tracing::debug!(plugin = %self.debug_tag(), "Reload ignored, plugin is pending");
            return;
        }
        self.unload(false).await;
        self.load(None).await;
    }

    /// Run and clear every disposer; failures are logged and never stop the rest
    async fn drain_disposers(&self) -> usize {
        let disposers = std::mem::take(&mut self.state().disposers);
        let count = disposers.len();

        for disposer in disposers {
            let label = disposer.label().to_string();
            if let Err(e) = disposer.dispose().await {
                tracing::error!(plugin = %self.debug_tag(), disposer = %label, error = %e, "Dispose error");
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryHostBridge;
    use crate::mock::{MockConnector, RecordingSurface};
    use crate::plugins::preferences::PreferenceStore;
    use exthost_api::DisposeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> (HostContext, Arc<MemoryHostBridge>, Arc<MockConnector>) {
        let bridge = Arc::new(MemoryHostBridge::new());
        let connector = Arc::new(MockConnector::new());
        let surface = Arc::new(RecordingSurface::new());
        let preferences = Arc::new(PreferenceStore::new(bridge.clone()));
        let themes = Arc::new(ThemeRegistry::new(
            surface.clone(),
            preferences,
            EventEmitter::new(16),
        ));
        let ctx = HostContext {
            bridge: bridge.clone(),
            connector: connector.clone(),
            surface,
            themes,
            event_capacity: 16,
        };
        (ctx, bridge, connector)
    }

    #[test]
    fn test_sanitize_lowercases_and_replaces() {
        assert_eq!(sanitize("Journals Calendar!"), "journals_calendar_");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_pending_states() {
        assert!(PluginStatus::Loading.is_pending());
        assert!(PluginStatus::Unloading.is_pending());
        assert!(!PluginStatus::Loaded.is_pending());
        assert!(!PluginStatus::Error.is_pending());
    }

    #[tokio::test]
    async fn test_key_is_used_as_identity() {
        let (ctx, _, _) = context();
        let instance = PluginInstance::new(PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1"), ctx);
        assert_eq!(instance.id(), "p1");
        assert_eq!(instance.status(), PluginStatus::Unloaded);
    }

    #[tokio::test]
    async fn test_bundled_load_connects_and_posts_ready() {
        let (ctx, _, connector) = context();
        let instance = PluginInstance::new(
            PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1").with_name("P One"),
            ctx,
        );

        instance.load(None).await;

        assert_eq!(instance.status(), PluginStatus::Loaded);
        assert!(instance.is_connected());
        assert_eq!(instance.settings_key(), "p_one_p1");
        let channel = connector.channel("p1").unwrap();
        assert_eq!(channel.posted(), vec![HostMessage::Ready]);
    }

    #[tokio::test]
    async fn test_unload_runs_disposers_in_order_despite_failures() {
        let (ctx, _, _) = context();
        let instance = PluginInstance::new(PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1"), ctx);
        instance.load(None).await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        instance.add_disposer(Disposer::from_fn("first", move || first.lock().unwrap().push("first")));
        instance.add_disposer(Disposer::new("broken", || async { Err(DisposeError::new("boom")) }));
        let last = Arc::clone(&order);
        instance.add_disposer(Disposer::from_fn("last", move || last.lock().unwrap().push("last")));

        let mut events = instance.subscribe();
        instance.unload(false).await;

        assert_eq!(*order.lock().unwrap(), vec!["first", "last"]);
        assert_eq!(instance.disposer_count(), 0);
        assert_eq!(instance.status(), PluginStatus::Unloaded);
        assert!(!instance.is_connected());
        assert_eq!(events.recv().await.unwrap(), InstanceEvent::BeforeUnload);
        assert_eq!(events.recv().await.unwrap(), InstanceEvent::Unloaded);
    }

    #[tokio::test]
    async fn test_unload_with_nothing_to_dispose_still_reaches_unloaded() {
        let (ctx, _, _) = context();
        let instance = PluginInstance::new(PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1"), ctx);

        instance.unload(false).await;

        assert_eq!(instance.status(), PluginStatus::Unloaded);
    }

    #[tokio::test]
    async fn test_connect_failure_records_error() {
        let (ctx, _, connector) = context();
        connector.fail_on("/p1/index.js");
        let instance = PluginInstance::new(PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1"), ctx);

        instance.load(None).await;

        assert_eq!(instance.status(), PluginStatus::Error);
        assert!(matches!(instance.last_error(), Some(PluginError::Sandbox(_))));
        assert_eq!(instance.disposer_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_illegal_package() {
        let (ctx, _, _) = context();
        let instance = PluginInstance::new(PluginOptions::from_source("/nowhere"), ctx);

        instance.load(None).await;

        assert_eq!(instance.status(), PluginStatus::Error);
        assert!(matches!(instance.last_error(), Some(PluginError::IllegalPackage(_))));
    }

    #[tokio::test]
    async fn test_app_call_forwards_snake_case_and_replies() {
        let (ctx, bridge, connector) = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bridge.register_method("get_current_page", move |_args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::String("journals".into()))
        });
        let instance = PluginInstance::new(PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1"), ctx);
        instance.load(None).await;

        instance
            .handle_message(PluginMessage::AppCall(AppCall {
                method: "getCurrentPage".into(),
                args: vec![],
                sync: Some(7),
            }))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let posted = connector.channel("p1").unwrap().posted();
        assert_eq!(
            posted.last(),
            Some(&HostMessage::Sync {
                id: 7,
                result: Value::String("journals".into()),
                error: None
            })
        );
    }

    #[tokio::test]
    async fn test_blank_style_is_ignored() {
        let (ctx, _, _) = context();
        let instance = PluginInstance::new(PluginOptions::bundled("/p1", "/p1/index.js").with_key("p1"), ctx);
        instance.load(None).await;
        let before = instance.disposer_count();

        instance.handle_message(PluginMessage::ProvideStyle("   ".into())).await;
        assert_eq!(instance.disposer_count(), before);

        instance.handle_message(PluginMessage::ProvideStyle("body {}".into())).await;
        assert_eq!(instance.disposer_count(), before + 1);
    }
}
