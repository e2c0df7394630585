//! Messages crossing the sandbox channel
//!
//! The transport is owned by the embedder; these enums are the only
//! vocabulary the core speaks over it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ThemeDescriptor, UiDescriptor};

/// Namespace for application-level hooks
pub const HOOK_APP: &str = "hook:app";

/// Namespace for editor-level hooks
pub const HOOK_EDITOR: &str = "hook:editor";

/// Messages the host posts into a plugin's sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// The host finished bootstrapping; the plugin may start its main logic
    Ready,
    /// A namespaced application event
    Hook {
        ns: String,
        kind: String,
        #[serde(default)]
        payload: Value,
    },
    /// Reply to an [`AppCall`] that carried a sync id
    Sync {
        id: u64,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl HostMessage {
    pub fn hook(ns: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self::Hook {
            ns: ns.into(),
            kind: kind.into(),
            payload,
        }
    }
}

/// A plugin asking the host to run one of its capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCall {
    /// Host method name, in any casing
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Present when the plugin awaits a reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<u64>,
}

/// Messages a plugin pushes to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PluginMessage {
    /// Merge a patch into the plugin's own settings
    SettingsUpdate(Map<String, Value>),
    /// Contribute a theme
    ProvideTheme(ThemeDescriptor),
    /// Inject a stylesheet
    ProvideStyle(String),
    /// Mount a UI fragment
    ProvideUi(UiDescriptor),
    /// Forward a call to a host capability
    AppCall(AppCall),
}
