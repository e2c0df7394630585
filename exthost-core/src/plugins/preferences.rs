//! PreferenceStore - persisted host-wide user preferences

use std::sync::{Arc, PoisonError, RwLock};

use exthost_api::{HostBridge, ThemeDescriptor, UserPreferences};

/// Cached view of the user preferences with best-effort persistence.
///
/// Bridge failures are logged and never surfaced: a host without readable
/// preferences still works with defaults.
pub struct PreferenceStore {
    bridge: Arc<dyn HostBridge>,
    current: RwLock<UserPreferences>,
}

impl PreferenceStore {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self {
            bridge,
            current: RwLock::new(UserPreferences::default()),
        }
    }

    /// Merge persisted preferences over the cached ones
    pub async fn load(&self) {
        let loaded = match self.bridge.load_user_preferences().await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load user preferences");
                return;
            }
        };

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if loaded.theme.is_some() {
            current.theme = loaded.theme;
        }
        current.externals = loaded.externals;
        current.extra.extend(loaded.extra);
    }

    /// Apply `patch` to the cached preferences and persist the result
    pub async fn save<F>(&self, patch: F)
    where
        F: FnOnce(&mut UserPreferences),
    {
        let snapshot = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            patch(&mut current);
            current.clone()
        };

        if let Err(e) = self.bridge.save_user_preferences(&snapshot).await {
            tracing::warn!(error = %e, "Failed to save user preferences");
        }
    }

    pub fn snapshot(&self) -> UserPreferences {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn theme(&self) -> Option<ThemeDescriptor> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .theme
            .clone()
    }

    pub fn externals(&self) -> Vec<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .externals
            .clone()
    }
}
