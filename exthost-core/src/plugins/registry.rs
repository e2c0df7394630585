//! PluginRegistry - owns every plugin instance and orchestrates batches
//!
//! Registration runs entries strictly one after another. A batch-wide
//! [`ReadyBarrier`] is resolved when the batch ends, however it ends, and
//! sandboxes loaded in the batch receive `Ready` only then.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use exthost_api::{HostBridge, HostSurface, PluginId, SandboxConnector};
use serde_json::Value;
use tokio::sync::broadcast;

use super::barrier::ReadyBarrier;
use super::batch::{LoadBatch, OneOrMany, RegisterReport};
use super::hooks::{HookDispatcher, HookNamespace};
use super::instance::{HostContext, PluginInstance};
use super::options::PluginOptions;
use super::preferences::PreferenceStore;
use super::settings::DISABLED_KEY;
use super::themes::ThemeRegistry;
use crate::config::HostConfig;
use crate::error::PluginError;
use crate::events::{EventEmitter, HostEvent};

/// A plugin addressed by identity or by instance
#[derive(Debug, Clone, Copy)]
pub enum PluginRef<'a> {
    Id(&'a str),
    Instance(&'a Arc<PluginInstance>),
}

impl<'a> From<&'a str> for PluginRef<'a> {
    fn from(id: &'a str) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a String> for PluginRef<'a> {
    fn from(id: &'a String) -> Self {
        Self::Id(id.as_str())
    }
}

impl<'a> From<&'a Arc<PluginInstance>> for PluginRef<'a> {
    fn from(instance: &'a Arc<PluginInstance>) -> Self {
        Self::Instance(instance)
    }
}

/// Instances by identity, remembering insertion order
#[derive(Default)]
struct PluginIndex {
    by_id: HashMap<PluginId, Arc<PluginInstance>>,
    order: Vec<PluginId>,
}

impl PluginIndex {
    fn insert(&mut self, id: PluginId, instance: Arc<PluginInstance>) -> bool {
        if self.by_id.contains_key(&id) {
            return false;
        }
        self.order.push(id.clone());
        self.by_id.insert(id, instance);
        true
    }

    fn remove(&mut self, id: &str) -> Option<Arc<PluginInstance>> {
        let instance = self.by_id.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(instance)
    }

    fn values(&self) -> Vec<Arc<PluginInstance>> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }
}

/// Clears the registering flag and resolves the batch barrier on every exit path
struct BatchGuard<'a> {
    registering: &'a AtomicBool,
    ready: ReadyBarrier,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.ready.resolve();
        self.registering.store(false, Ordering::SeqCst);
    }
}

/// External sources to re-register on bootstrap: remembered sources no
/// incoming manifest-resolved entry already covers
fn externals_to_restore(incoming: &[PluginOptions], externals: &[String]) -> Vec<String> {
    externals
        .iter()
        .filter(|url| {
            !incoming
                .iter()
                .any(|p| p.entry.is_none() && p.source.as_deref() == Some(url.as_str()))
        })
        .cloned()
        .collect()
}

/// The extension host's plugin registry
pub struct PluginRegistry {
    config: HostConfig,
    ctx: HostContext,
    preferences: Arc<PreferenceStore>,
    plugins: RwLock<PluginIndex>,
    registering: AtomicBool,
    ready: Mutex<Option<ReadyBarrier>>,
    batch_lock: tokio::sync::Mutex<()>,
    dispatcher: HookDispatcher,
    events: EventEmitter<HostEvent>,
}

impl PluginRegistry {
    pub fn new(
        config: HostConfig,
        bridge: Arc<dyn HostBridge>,
        connector: Arc<dyn SandboxConnector>,
        surface: Arc<dyn HostSurface>,
    ) -> Self {
        let events = EventEmitter::new(config.event_capacity);
        let preferences = Arc::new(PreferenceStore::new(Arc::clone(&bridge)));
        let themes = Arc::new(ThemeRegistry::new(
            Arc::clone(&surface),
            Arc::clone(&preferences),
            events.clone(),
        ));
        let ctx = HostContext {
            bridge,
            connector,
            surface,
            themes,
            event_capacity: config.event_capacity,
        };

        Self {
            config,
            ctx,
            preferences,
            plugins: RwLock::new(PluginIndex::default()),
            registering: AtomicBool::new(false),
            ready: Mutex::new(None),
            batch_lock: tokio::sync::Mutex::new(()),
            dispatcher: HookDispatcher,
            events,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn themes(&self) -> &Arc<ThemeRegistry> {
        &self.ctx.themes
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    /// Whether a registration batch is in progress
    pub fn is_registering(&self) -> bool {
        self.registering.load(Ordering::SeqCst)
    }

    /// Barrier of the most recent batch
    pub fn ready_barrier(&self) -> Option<ReadyBarrier> {
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    pub fn get(&self, id: &str) -> Option<Arc<PluginInstance>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .cloned()
    }

    /// Registered instances in registration order
    pub fn plugins(&self) -> Vec<Arc<PluginInstance>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
    }

    pub fn ids(&self) -> Vec<PluginId> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    pub fn len(&self) -> usize {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a plugin reference, failing with [`PluginError::NotFound`]
    pub fn ensure<'a>(&self, plugin: impl Into<PluginRef<'a>>) -> Result<Arc<PluginInstance>, PluginError> {
        match plugin.into() {
            PluginRef::Instance(instance) => Ok(Arc::clone(instance)),
            PluginRef::Id(id) => self.get(id).ok_or_else(|| PluginError::not_found(id)),
        }
    }

    /// Load and index plugins, one after another.
    ///
    /// With `initial` set, remembered external sources not already covered
    /// by the batch are appended to it. Failed entries are reported and
    /// skipped; the batch always runs to the end.
    pub async fn register(&self, plugins: impl Into<OneOrMany<PluginOptions>>, initial: bool) -> RegisterReport {
        let mut plugins = plugins.into().into_vec();
        let _batch = self.batch_lock.lock().await;

        let ready = ReadyBarrier::new();
        *self.ready.lock().unwrap_or_else(PoisonError::into_inner) = Some(ready.clone());
        self.registering.store(true, Ordering::SeqCst);
        let _guard = BatchGuard {
            registering: &self.registering,
            ready: ready.clone(),
        };

        self.preferences.load().await;
        let mut externals = self.preferences.externals();

        if initial {
            let restored = externals_to_restore(&plugins, &externals);
            if !restored.is_empty() {
                tracing::debug!(count = restored.len(), "Restoring external plugins");
            }
            plugins.extend(restored.into_iter().map(PluginOptions::from_source));
        }

        tracing::info!(count = plugins.len(), initial, "Registering plugins");
        let mut report = RegisterReport::default();

        for options in plugins {
            let external = options
                .source
                .clone()
                .filter(|source| options.entry.is_none() && self.is_external_source(source));

            let instance = PluginInstance::new(options, self.ctx.clone());
            let batch = LoadBatch {
                ready: ready.clone(),
                registered: self.ids().into_iter().collect::<HashSet<_>>(),
            };
            instance.load(Some(&batch)).await;
            let id = instance.id();

            let error = instance.last_error().or_else(|| {
                let indexed = self
                    .plugins
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id.clone(), Arc::clone(&instance));
                (!indexed).then(|| PluginError::ExistingImport { id: id.clone() })
            });

            if let Some(error) = error {
                if error.is_recoverable() {
                    tracing::warn!(plugin = %id, error = %error, "Skipping plugin");
                } else {
                    tracing::error!(plugin = %id, error = %error, "Plugin failed, not registered");
                }
                // Indexing may have been refused after a successful load
                if instance.is_loaded() {
                    instance.unload(false).await;
                }
                self.events.emit(HostEvent::Error {
                    id: id.clone(),
                    error: error.clone(),
                });
                report.failed.push((id, error));
                continue;
            }

            self.relay_settings(&instance);
            self.events.emit(HostEvent::Registered { id: id.clone() });

            if let Some(source) = external.filter(|source| !externals.contains(source)) {
                externals.push(source);
            }
            report.loaded.push(id);
        }

        self.preferences
            .save(move |prefs| prefs.externals = externals)
            .await;
        self.ctx.themes.activate_user_preferences().await;

        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Registration finished"
        );
        report
    }

    fn is_external_source(&self, source: &str) -> bool {
        self.config.local_user_config_root.is_some() && !self.config.is_local_source(source)
    }

    /// Re-emit an instance's settings changes as registry events
    fn relay_settings(&self, instance: &Arc<PluginInstance>) {
        let Some(settings) = instance.settings() else {
            return;
        };
        let mut changes = settings.subscribe();
        let store = Arc::downgrade(&settings);
        let events = self.events.clone();
        let id = instance.id();

        tokio::spawn(async move {
            loop {
                let settings = match changes.recv().await {
                    Ok(change) => change.new,
                    // Skipped changes collapse into the current snapshot
                    Err(broadcast::error::RecvError::Lagged(_)) => match store.upgrade() {
                        Some(store) => store.snapshot(),
                        None => break,
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                events.emit(HostEvent::SettingsChanged {
                    id: id.clone(),
                    settings,
                });
            }
        });
    }

    /// Reload each plugin in turn. Every identity is resolved before any reload.
    pub async fn reload(&self, ids: impl Into<OneOrMany<PluginId>>) -> Result<(), PluginError> {
        let instances = self.resolve_all(ids)?;
        for instance in instances {
            instance.reload().await;
        }
        Ok(())
    }

    /// Unload plugins, delete their persisted files and drop them from the
    /// registry. Unknown identities fail the call before anything changes.
    pub async fn unregister(&self, ids: impl Into<OneOrMany<PluginId>>) -> Result<(), PluginError> {
        let instances = self.resolve_all(ids)?;
        for instance in instances {
            instance.unload(true).await;
            let id = instance.id();
            self.plugins
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            tracing::info!(plugin = %id, "Plugin unregistered");
            self.events.emit(HostEvent::Unregistered { id });
        }
        Ok(())
    }

    fn resolve_all(&self, ids: impl Into<OneOrMany<PluginId>>) -> Result<Vec<Arc<PluginInstance>>, PluginError> {
        ids.into()
            .into_vec()
            .iter()
            .map(|id| self.ensure(id))
            .collect()
    }

    /// Clear the plugin's `disabled` setting. Ignored while the plugin is pending.
    pub fn enable(&self, id: &str) -> Result<(), PluginError> {
        self.set_disabled(id, false)
    }

    /// Set the plugin's `disabled` setting. Ignored while the plugin is pending.
    pub fn disable(&self, id: &str) -> Result<(), PluginError> {
        self.set_disabled(id, true)
    }

    fn set_disabled(&self, id: &str, disabled: bool) -> Result<(), PluginError> {
        let instance = self.ensure(id)?;
        if instance.is_pending() {
            tracing::debug!(plugin = %id, disabled, "Toggle ignored, plugin is pending");
            return Ok(());
        }

        let event = if disabled {
            HostEvent::BeforeDisable { id: id.to_string() }
        } else {
            HostEvent::BeforeEnable { id: id.to_string() }
        };
        self.events.emit(event);

        if let Some(settings) = instance.settings() {
            settings.set(DISABLED_KEY, disabled);
        }
        Ok(())
    }

    /// Dispatch an application hook to every connected plugin
    pub fn hook_app(&self, kind: &str, payload: Value) -> usize {
        self.dispatch(HookNamespace::App, kind, payload)
    }

    /// Dispatch an editor hook to every connected plugin
    pub fn hook_editor(&self, kind: &str, payload: Value) -> usize {
        self.dispatch(HookNamespace::Editor, kind, payload)
    }

    fn dispatch(&self, ns: HookNamespace, kind: &str, payload: Value) -> usize {
        let targets = self.plugins();
        self.dispatcher.dispatch(&targets, ns, kind, &payload)
    }

    /// Unload every plugin and empty the registry, without deleting files
    pub async fn shutdown(&self) {
        let instances = {
            let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
            let instances = plugins.values();
            *plugins = PluginIndex::default();
            instances
        };

        tracing::info!(count = instances.len(), "Shutting down plugins");
        for instance in instances {
            instance.unload(false).await;
        }
    }
}
