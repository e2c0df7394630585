//! exthost-api - collaborator contracts for the exthost extension host
//!
//! The extension host core never talks to a concrete runtime. Everything
//! host-specific is supplied by an integration layer through the traits in
//! this crate:
//!
//! - [`HostBridge`]: manifests, settings, preferences and host capabilities
//! - [`SandboxConnector`] / [`SandboxChannel`]: isolated plugin execution
//! - [`HostSurface`]: theme, style and UI injection
//!
//! plus the messages and data types shared across those seams.
//!
//! # Example
//!
//! ```ignore
//! use exthost_api::{HostMessage, SandboxChannel, SandboxError};
//!
//! struct LoggingChannel;
//!
//! #[async_trait::async_trait]
//! impl SandboxChannel for LoggingChannel {
//!     fn post(&self, message: HostMessage) -> Result<(), SandboxError> {
//!         println!("-> {:?}", message);
//!         Ok(())
//!     }
//!
//!     async fn destroy(&self) -> Result<(), SandboxError> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod bridge;
pub mod disposer;
pub mod error;
pub mod message;
pub mod sandbox;
pub mod surface;
pub mod types;

pub use bridge::HostBridge;
pub use disposer::{DisposeFuture, Disposer};
pub use error::{BridgeError, DisposeError, SandboxError, SurfaceError};
pub use message::{AppCall, HOOK_APP, HOOK_EDITOR, HostMessage, PluginMessage};
pub use sandbox::{InboundSender, SandboxChannel, SandboxConnector};
pub use surface::{HeadlessSurface, HostSurface};
pub use types::*;
