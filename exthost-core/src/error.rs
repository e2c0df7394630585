//! Error types for exthost-core

use exthost_api::{BridgeError, DisposeError, SandboxError, SurfaceError};
use thiserror::Error;

/// Errors that can occur while hosting plugins
///
/// Load failures are recorded on the plugin instance rather than returned,
/// so the type is `Clone` to let the registry fan it out in events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    /// Manifest missing or unparseable
    #[error("Illegal plugin package: {0}")]
    IllegalPackage(String),

    /// Identity already registered during a bootstrap import
    #[error("Plugin '{id}' is already registered")]
    ExistingImport { id: String },

    /// Sandbox connection or messaging failed
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Host bridge call failed
    #[error("Host bridge error: {0}")]
    Bridge(String),

    /// Host surface injection failed
    #[error("Surface error: {0}")]
    Surface(String),

    /// No plugin with this identity is registered
    #[error("Plugin '{id}' not found")]
    NotFound { id: String },

    /// A cleanup action failed
    #[error("Dispose error: {0}")]
    Dispose(String),

    /// Host configuration could not be read or written
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl PluginError {
    /// Failures the registry skips over while continuing a batch
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IllegalPackage(_) | Self::ExistingImport { .. })
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IllegalPackage(_) => "illegal_package",
            Self::ExistingImport { .. } => "existing_import",
            Self::Sandbox(_) => "sandbox",
            Self::Bridge(_) => "bridge",
            Self::Surface(_) => "surface",
            Self::NotFound { .. } => "not_found",
            Self::Dispose(_) => "dispose",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

impl From<SandboxError> for PluginError {
    fn from(err: SandboxError) -> Self {
        Self::Sandbox(err.to_string())
    }
}

impl From<BridgeError> for PluginError {
    fn from(err: BridgeError) -> Self {
        Self::Bridge(err.to_string())
    }
}

impl From<SurfaceError> for PluginError {
    fn from(err: SurfaceError) -> Self {
        Self::Surface(err.to_string())
    }
}

impl From<DisposeError> for PluginError {
    fn from(err: DisposeError) -> Self {
        Self::Dispose(err.to_string())
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(PluginError::IllegalPackage("no manifest".to_string()).is_recoverable());
        assert!(
            PluginError::ExistingImport {
                id: "p1".to_string()
            }
            .is_recoverable()
        );
        assert!(!PluginError::Sandbox("refused".to_string()).is_recoverable());
        assert!(!PluginError::not_found("p1").is_recoverable());
    }

    #[test]
    fn test_not_found_display() {
        let err = PluginError::not_found("test-plugin");
        assert!(err.to_string().contains("test-plugin"));
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_sandbox_error_conversion() {
        let err: PluginError = SandboxError::Connect("frame blocked".to_string()).into();
        assert!(matches!(err, PluginError::Sandbox(ref msg) if msg.contains("frame blocked")));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PluginError = io_err.into();
        assert!(matches!(err, PluginError::Io(_)));
    }
}
