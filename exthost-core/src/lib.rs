//! exthost-core: Core library for the exthost extension host
//!
//! This crate manages the lifecycle of sandboxed plugins:
//!
//! - **Registry** - [`PluginRegistry`] registers, reloads, unregisters and toggles plugins
//! - **Lifecycle** - [`PluginInstance`] loads a package, connects its sandbox and tears it down
//! - **Settings** - [`SettingsStore`] per plugin; flipping `disabled` unloads or loads
//! - **Themes** - [`ThemeRegistry`] tracks contributions and applies the selected theme
//! - **Events** - [`EventEmitter`] broadcasts [`HostEvent`]s and [`InstanceEvent`]s
//! - **Bridges** - [`FsHostBridge`] and [`MemoryHostBridge`] persist host state
//!
//! The sandbox runtime and the visual surface are supplied by the embedder
//! through the [`exthost_api`] traits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  PluginRegistry                  │
//! │  ┌───────────────┐ ┌─────────────┐ ┌───────────┐ │
//! │  │PluginInstance │ │ThemeRegistry│ │Preference │ │
//! │  │ SettingsStore │ │             │ │  Store    │ │
//! │  │ disposers     │ └──────┬──────┘ └─────┬─────┘ │
//! │  └───┬───────┬───┘        │              │       │
//! └──────┼───────┼────────────┼──────────────┼───────┘
//!        ▼       ▼            ▼              ▼
//!  SandboxConnector      HostSurface     HostBridge
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod mock;
pub mod plugins;

// Re-export key types for convenience
pub use bridge::{FsHostBridge, MemoryHostBridge, MethodTable};
pub use config::HostConfig;
pub use error::PluginError;
pub use events::{EventEmitter, HostEvent, InstanceEvent, ThemeDelta, ThemeMap};
pub use mock::{MockChannel, MockConnector, RecordingSurface};
pub use plugins::{
    DISABLED_KEY, HostContext, PackageManifest, PluginInfo, PluginInstance, PluginOptions,
    PluginRegistry, PluginStatus, ReadyBarrier, RegisterReport, SettingsStore, ThemeRegistry,
};
