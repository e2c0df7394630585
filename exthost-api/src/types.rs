//! Shared data types exchanged between the host core and its collaborators

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identity of a registered plugin
pub type PluginId = String;

/// How a plugin's isolated execution context is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxMode {
    /// Runs in a shadow root of the host document
    Shadow,
    /// Runs in a dedicated frame
    #[default]
    Iframe,
}

impl SandboxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Iframe => "iframe",
        }
    }
}

/// A theme contributed by a plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeDescriptor {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stylesheet location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `light` or `dark`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Identity of the contributing plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<PluginId>,
    /// Fields the host does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThemeDescriptor {
    /// Theme pointing at a stylesheet
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// A UI fragment a plugin asks the host to mount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiDescriptor {
    /// Stable key so re-provided UI replaces the previous mount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Host slot or selector to mount into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Markup; sanitizing it is the surface's job
    #[serde(default)]
    pub template: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Process-wide user preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Currently selected theme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeDescriptor>,
    /// External plugin source locations, in discovery order
    #[serde(default)]
    pub externals: Vec<String>,
    /// Keys owned by other parts of the application
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Everything a sandbox connector needs to start a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSpec {
    pub id: PluginId,
    pub name: String,
    /// Fully resolved entry file location
    pub entry: String,
    pub mode: SandboxMode,
    /// Package root used to resolve relative resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_root: Option<String>,
}
