//! HostBridge - the core's only door to host storage and host capabilities

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::types::UserPreferences;

/// Async access to everything the host application persists or exposes.
///
/// Every method is a suspension point for the core. Missing documents are
/// reported as `Ok(None)`, not as errors.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Read the raw manifest text of the package at `source`
    async fn load_plugin_manifest(&self, source: &str) -> Result<Option<String>, BridgeError>;

    /// Write a manifest back to the package at `source`
    async fn save_plugin_manifest(&self, source: &str, manifest: &Value)
    -> Result<(), BridgeError>;

    /// Read persisted settings for the plugin stored under `key`
    async fn load_plugin_settings(
        &self,
        key: &str,
    ) -> Result<Option<Map<String, Value>>, BridgeError>;

    /// Persist settings for the plugin stored under `key`
    async fn save_plugin_settings(
        &self,
        key: &str,
        settings: &Map<String, Value>,
    ) -> Result<(), BridgeError>;

    async fn load_user_preferences(&self) -> Result<Option<UserPreferences>, BridgeError>;

    async fn save_user_preferences(&self, preferences: &UserPreferences)
    -> Result<(), BridgeError>;

    /// Run a host capability on behalf of a sandboxed plugin.
    ///
    /// `method` is already normalized to snake_case.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError>;

    /// Delete whatever the host persisted for an unregistered plugin
    async fn remove_plugin_files(
        &self,
        _source: Option<&str>,
        _settings_key: &str,
    ) -> Result<(), BridgeError> {
        Ok(())
    }
}
