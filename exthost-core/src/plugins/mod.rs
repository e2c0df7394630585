//! Plugin system for exthost
//!
//! - [`PluginRegistry`]: owns instances, runs registration batches, toggles and hooks
//! - [`PluginInstance`]: one plugin's load/unload lifecycle and its disposers
//! - [`SettingsStore`]: reactive per-plugin settings; `disabled` drives enablement
//! - [`ThemeRegistry`]: theme contributions and the selected theme
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use exthost_core::{FsHostBridge, HostConfig, PluginOptions, PluginRegistry};
//!
//! let config = HostConfig::default();
//! let bridge = Arc::new(FsHostBridge::new(&config));
//! let registry = PluginRegistry::new(config, bridge, connector, surface);
//!
//! let report = registry
//!     .register(vec![PluginOptions::from_source("/plugins/calendar")], true)
//!     .await;
//! registry.hook_app("routeChanged", serde_json::json!({"path": "/"}));
//! ```

mod barrier;
mod batch;
mod hooks;
mod instance;
mod manifest;
mod options;
mod preferences;
mod registry;
mod settings;
mod themes;

pub use barrier::ReadyBarrier;
pub use batch::{LoadBatch, OneOrMany, RegisterReport};
pub use hooks::{HookDispatcher, HookNamespace};
pub use instance::{HostContext, PluginInfo, PluginInstance, PluginStatus};
pub use manifest::{
    MANIFEST_FILE, PackageManifest, PluginBlock, ThemeList, resolve_location, resolve_theme_url,
};
pub use options::PluginOptions;
pub use preferences::PreferenceStore;
pub use registry::{PluginRef, PluginRegistry};
pub use settings::{DISABLED_KEY, SettingsChange, SettingsStore};
pub use themes::ThemeRegistry;
