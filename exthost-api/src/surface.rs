//! HostSurface - theme, style and UI injection into the host application

use async_trait::async_trait;

use crate::disposer::Disposer;
use crate::error::SurfaceError;
use crate::types::{ThemeDescriptor, UiDescriptor};

/// The visual surface of the host application.
///
/// Injection returns a [`Disposer`] that removes what was injected; the core
/// attaches it to the owning plugin so it runs on unload.
#[async_trait]
pub trait HostSurface: Send + Sync {
    /// Apply a theme, or reset to the default theme with `None`
    async fn inject_theme(&self, theme: Option<&ThemeDescriptor>) -> Result<(), SurfaceError>;

    async fn inject_style(&self, plugin: &str, css: &str) -> Result<Disposer, SurfaceError>;

    async fn inject_ui(&self, plugin: &str, ui: &UiDescriptor) -> Result<Disposer, SurfaceError>;

    /// Completes once the host UI exists and UI fragments can be mounted
    async fn host_mounted(&self) {}
}

/// Surface for hosts without any UI; every injection is a no-op
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

#[async_trait]
impl HostSurface for HeadlessSurface {
    async fn inject_theme(&self, _theme: Option<&ThemeDescriptor>) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn inject_style(&self, plugin: &str, _css: &str) -> Result<Disposer, SurfaceError> {
        Ok(Disposer::noop(format!("style:{}", plugin)))
    }

    async fn inject_ui(&self, plugin: &str, _ui: &UiDescriptor) -> Result<Disposer, SurfaceError> {
        Ok(Disposer::noop(format!("ui:{}", plugin)))
    }
}
