//! Sandbox transport contracts
//!
//! How an isolated context is created and messaged is up to the embedder.
//! The core only connects, posts and destroys.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SandboxError;
use crate::message::{HostMessage, PluginMessage};
use crate::types::SandboxSpec;

/// Sender half handed to the transport for plugin-to-host traffic
pub type InboundSender = mpsc::UnboundedSender<PluginMessage>;

/// Creates isolated execution contexts for plugins
#[async_trait]
pub trait SandboxConnector: Send + Sync {
    /// Start the plugin described by `spec`.
    ///
    /// Messages the plugin sends to the host must be pushed into `inbound`.
    async fn connect(
        &self,
        spec: &SandboxSpec,
        inbound: InboundSender,
    ) -> Result<Arc<dyn SandboxChannel>, SandboxError>;
}

/// A live connection to one plugin's sandbox
#[async_trait]
pub trait SandboxChannel: Send + Sync {
    /// Queue a message for the plugin without waiting for delivery
    fn post(&self, message: HostMessage) -> Result<(), SandboxError>;

    /// Tear the sandbox down
    async fn destroy(&self) -> Result<(), SandboxError>;
}
