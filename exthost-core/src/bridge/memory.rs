//! In-memory host bridge

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use exthost_api::{BridgeError, HostBridge, UserPreferences};
use serde_json::{Map, Value};

use super::MethodTable;

#[derive(Debug, Default)]
struct Store {
    manifests: HashMap<String, String>,
    settings: HashMap<String, Map<String, Value>>,
    preferences: Option<UserPreferences>,
    removed: Vec<String>,
}

/// Keeps manifests, settings and preferences in memory
#[derive(Debug, Default)]
pub struct MemoryHostBridge {
    store: Mutex<Store>,
    methods: MethodTable,
    fail_settings_load: AtomicBool,
    fail_preferences_load: AtomicBool,
}

impl MemoryHostBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Provide the manifest for `source`
    pub fn insert_manifest(&self, source: impl Into<String>, manifest: &Value) {
        self.store()
            .manifests
            .insert(source.into(), manifest.to_string());
    }

    /// Provide raw manifest text for `source`
    pub fn insert_raw_manifest(&self, source: impl Into<String>, raw: impl Into<String>) {
        self.store().manifests.insert(source.into(), raw.into());
    }

    pub fn manifest(&self, source: &str) -> Option<Value> {
        self.store()
            .manifests
            .get(source)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn insert_settings(&self, key: impl Into<String>, settings: Map<String, Value>) {
        self.store().settings.insert(key.into(), settings);
    }

    pub fn settings(&self, key: &str) -> Option<Map<String, Value>> {
        self.store().settings.get(key).cloned()
    }

    pub fn set_preferences(&self, preferences: UserPreferences) {
        self.store().preferences = Some(preferences);
    }

    pub fn preferences(&self) -> Option<UserPreferences> {
        self.store().preferences.clone()
    }

    /// Settings keys passed to `remove_plugin_files`, in call order
    pub fn removed(&self) -> Vec<String> {
        self.store().removed.clone()
    }

    pub fn register_method<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        self.methods.register(name, handler);
    }

    /// Make settings loads fail
    pub fn fail_settings_load(&self, fail: bool) {
        self.fail_settings_load.store(fail, Ordering::SeqCst);
    }

    /// Make preference loads fail
    pub fn fail_preferences_load(&self, fail: bool) {
        self.fail_preferences_load.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl HostBridge for MemoryHostBridge {
    async fn load_plugin_manifest(&self, source: &str) -> Result<Option<String>, BridgeError> {
        Ok(self.store().manifests.get(source).cloned())
    }

    async fn save_plugin_manifest(&self, source: &str, manifest: &Value) -> Result<(), BridgeError> {
        self.store()
            .manifests
            .insert(source.to_string(), serde_json::to_string(manifest)?);
        Ok(())
    }

    async fn load_plugin_settings(&self, key: &str) -> Result<Option<Map<String, Value>>, BridgeError> {
        if self.fail_settings_load.load(Ordering::SeqCst) {
            return Err(BridgeError::Remote(format!("settings unavailable: {}", key)));
        }
        Ok(self.settings(key))
    }

    async fn save_plugin_settings(&self, key: &str, settings: &Map<String, Value>) -> Result<(), BridgeError> {
        self.insert_settings(key, settings.clone());
        Ok(())
    }

    async fn load_user_preferences(&self) -> Result<Option<UserPreferences>, BridgeError> {
        if self.fail_preferences_load.load(Ordering::SeqCst) {
            return Err(BridgeError::Remote("preferences unavailable".to_string()));
        }
        Ok(self.preferences())
    }

    async fn save_user_preferences(&self, preferences: &UserPreferences) -> Result<(), BridgeError> {
        self.set_preferences(preferences.clone());
        Ok(())
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.methods.call(method, args)
    }

    async fn remove_plugin_files(&self, _source: Option<&str>, settings_key: &str) -> Result<(), BridgeError> {
        let mut store = self.store();
        store.settings.remove(settings_key);
        store.removed.push(settings_key.to_string());
        Ok(())
    }
}
