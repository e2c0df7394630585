//! Host configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PluginError;

/// Default capacity of every broadcast channel the host creates
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for the extension host
///
/// Stored as TOML in `~/.config/exthost/exthost.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Root of locally installed plugin packages.
    ///
    /// Plugin sources outside of it are remembered as external sources.
    /// `None` disables external-source bookkeeping.
    #[serde(default)]
    pub local_user_config_root: Option<PathBuf>,

    /// Where [`FsHostBridge`](crate::bridge::FsHostBridge) keeps per-plugin settings
    #[serde(default = "exthost_paths::settings_dir")]
    pub settings_dir: PathBuf,

    /// Where [`FsHostBridge`](crate::bridge::FsHostBridge) keeps user preferences
    #[serde(default = "exthost_paths::preferences_path")]
    pub preferences_path: PathBuf,

    /// Capacity of event broadcast channels
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            local_user_config_root: Some(exthost_paths::config_dir()),
            settings_dir: exthost_paths::settings_dir(),
            preferences_path: exthost_paths::preferences_path(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Config rooted at `root`, with settings and preferences stored under it
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            settings_dir: root.join("settings"),
            preferences_path: root.join("preferences.json"),
            local_user_config_root: Some(root),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Returns the default configuration if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> Result<Self, PluginError> {
        Self::load(&exthost_paths::host_config_path())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), PluginError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PluginError::Config(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Whether `source` lives under the local user-config root
    pub fn is_local_source(&self, source: &str) -> bool {
        self.local_user_config_root
            .as_deref()
            .is_some_and(|root| source_path(source).starts_with(root))
    }
}

/// Strip a `file://` protocol from a plugin source
pub(crate) fn source_path(source: &str) -> &Path {
    Path::new(source.strip_prefix("file://").unwrap_or(source))
}
