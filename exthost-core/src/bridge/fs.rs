//! File-backed host bridge

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use exthost_api::{BridgeError, HostBridge, UserPreferences};
use serde_json::{Map, Value};

use super::MethodTable;
use crate::config::{HostConfig, source_path};
use crate::plugins::MANIFEST_FILE;

/// Stores settings as `<settings_dir>/<key>.json` and preferences as a
/// single JSON file. Manifests are read from `<source>/package.json`.
#[derive(Debug)]
pub struct FsHostBridge {
    settings_dir: PathBuf,
    preferences_path: PathBuf,
    methods: MethodTable,
}

async fn read_optional(path: &Path) -> Result<Option<String>, BridgeError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<(), BridgeError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

impl FsHostBridge {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            settings_dir: config.settings_dir.clone(),
            preferences_path: config.preferences_path.clone(),
            methods: MethodTable::new(),
        }
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    fn settings_path(&self, key: &str) -> PathBuf {
        self.settings_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl HostBridge for FsHostBridge {
    async fn load_plugin_manifest(&self, source: &str) -> Result<Option<String>, BridgeError> {
        read_optional(&source_path(source).join(MANIFEST_FILE)).await
    }

    async fn save_plugin_manifest(&self, source: &str, manifest: &Value) -> Result<(), BridgeError> {
        write_json(&source_path(source).join(MANIFEST_FILE), manifest).await
    }

    async fn load_plugin_settings(&self, key: &str) -> Result<Option<Map<String, Value>>, BridgeError> {
        match read_optional(&self.settings_path(key)).await? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    async fn save_plugin_settings(&self, key: &str, settings: &Map<String, Value>) -> Result<(), BridgeError> {
        write_json(&self.settings_path(key), settings).await
    }

    async fn load_user_preferences(&self) -> Result<Option<UserPreferences>, BridgeError> {
        match read_optional(&self.preferences_path).await? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    async fn save_user_preferences(&self, preferences: &UserPreferences) -> Result<(), BridgeError> {
        write_json(&self.preferences_path, preferences).await
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.methods.call(method, args)
    }

    async fn remove_plugin_files(&self, _source: Option<&str>, settings_key: &str) -> Result<(), BridgeError> {
        match tokio::fs::remove_file(self.settings_path(settings_key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
