//! Event types emitted by the extension host

use std::collections::HashMap;

use exthost_api::{PluginId, ThemeDescriptor};
use serde_json::{Map, Value};

use crate::error::PluginError;

/// Theme contributions keyed by plugin identity
pub type ThemeMap = HashMap<PluginId, Vec<ThemeDescriptor>>;

/// What changed in the theme map
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeDelta {
    /// Plugin whose contributions changed
    pub id: PluginId,
    /// The added theme, `None` when the plugin's themes were removed
    pub theme: Option<ThemeDescriptor>,
}

/// Registry-wide events for host consumption
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A plugin was loaded and indexed
    Registered { id: PluginId },
    /// A plugin was unloaded and removed from the registry
    Unregistered { id: PluginId },
    /// A plugin failed to load
    Error { id: PluginId, error: PluginError },
    /// A registered plugin's settings changed
    SettingsChanged {
        id: PluginId,
        settings: Map<String, Value>,
    },
    /// The theme contribution map changed
    ThemeChanged { themes: ThemeMap, delta: ThemeDelta },
    /// A theme was applied
    ThemeSelected { theme: Option<ThemeDescriptor> },
    /// A plugin is about to be enabled
    BeforeEnable { id: PluginId },
    /// A plugin is about to be disabled
    BeforeDisable { id: PluginId },
}

impl HostEvent {
    /// Event name as exposed to host scripts
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::Unregistered { .. } => "unregistered",
            Self::Error { .. } => "error",
            Self::SettingsChanged { .. } => "settings-changed",
            Self::ThemeChanged { .. } => "theme-changed",
            Self::ThemeSelected { .. } => "theme-selected",
            Self::BeforeEnable { .. } => "before-enable",
            Self::BeforeDisable { .. } => "before-disable",
        }
    }
}

/// Events emitted by a single plugin instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceEvent {
    /// Unload started; disposers have not run yet
    BeforeUnload,
    /// All disposers ran
    Unloaded,
}
