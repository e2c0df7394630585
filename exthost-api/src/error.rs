//! Error types for host collaborators

use thiserror::Error;

/// Errors raised by a [`HostBridge`](crate::HostBridge) implementation
#[derive(Error, Debug)]
pub enum BridgeError {
    /// IO error while reading or writing host storage
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote call targeted a method the host does not expose
    #[error("Unknown host method: {0}")]
    UnknownMethod(String),

    /// Host method ran and failed
    #[error("Host call failed: {0}")]
    Remote(String),
}

/// Errors raised by the sandbox transport
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The isolated context could not be created
    #[error("Sandbox connection failed: {0}")]
    Connect(String),

    /// The channel has already been destroyed
    #[error("Sandbox channel closed")]
    Closed,

    /// A message could not be delivered
    #[error("Sandbox post failed: {0}")]
    Post(String),

    /// Tearing down the context failed
    #[error("Sandbox destroy failed: {0}")]
    Destroy(String),
}

/// Errors raised by the host UI surface
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Injection failed: {0}")]
    Injection(String),
}

/// Failure of a single cleanup action
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DisposeError(String);

impl DisposeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<SandboxError> for DisposeError {
    fn from(err: SandboxError) -> Self {
        Self(err.to_string())
    }
}

impl From<SurfaceError> for DisposeError {
    fn from(err: SurfaceError) -> Self {
        Self(err.to_string())
    }
}
