//! Plugin registration options

use exthost_api::{PluginId, SandboxMode};
use serde::{Deserialize, Serialize};

/// What the host knows about a plugin before and after loading it.
///
/// Registration usually supplies only a `source`; manifest resolution fills
/// in the entry point and descriptive fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Explicit identity, e.g. from a plugin marketplace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PluginId>,
    /// Main file location; absent for packages resolved from a manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Package location
    #[serde(default, alias = "url", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub mode: SandboxMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl PluginOptions {
    /// A package to be resolved from its manifest
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }

    /// A package whose entry point is already known
    pub fn bundled(source: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            entry: Some(entry.into()),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<PluginId>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mode(mut self, mode: SandboxMode) -> Self {
        self.mode = mode;
        self
    }
}
