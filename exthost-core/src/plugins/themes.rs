//! ThemeRegistry - theme contributions and the selected theme

use std::sync::{Arc, PoisonError, RwLock};

use exthost_api::{HostSurface, ThemeDescriptor};
use tokio::sync::broadcast;

use super::preferences::PreferenceStore;
use crate::error::PluginError;
use crate::events::{EventEmitter, HostEvent, ThemeDelta, ThemeMap};

/// Map of plugin identity to contributed themes.
///
/// Every mutation emits [`HostEvent::ThemeChanged`] with a full snapshot.
pub struct ThemeRegistry {
    themes: RwLock<ThemeMap>,
    surface: Arc<dyn HostSurface>,
    preferences: Arc<PreferenceStore>,
    events: EventEmitter<HostEvent>,
}

impl ThemeRegistry {
    pub fn new(
        surface: Arc<dyn HostSurface>,
        preferences: Arc<PreferenceStore>,
        events: EventEmitter<HostEvent>,
    ) -> Self {
        Self {
            themes: RwLock::new(ThemeMap::new()),
            surface,
            preferences,
            events,
        }
    }

    /// Add a theme to `id`'s contributions.
    ///
    /// Returns `true` when this is the plugin's first theme, i.e. when the
    /// caller should arrange for [`unregister_theme`](Self::unregister_theme)
    /// to run on unload. Empty identities are ignored.
    pub fn register_theme(&self, id: &str, theme: ThemeDescriptor) -> bool {
        if id.is_empty() {
            return false;
        }

        let (first, snapshot) = {
            let mut themes = self.themes.write().unwrap_or_else(PoisonError::into_inner);
            let entry = themes.entry(id.to_string()).or_default();
            let first = entry.is_empty();
            entry.push(theme.clone());
            (first, themes.clone())
        };

        tracing::debug!(plugin = %id, theme = ?theme.name, "Theme registered");
        self.events.emit(HostEvent::ThemeChanged {
            themes: snapshot,
            delta: ThemeDelta {
                id: id.to_string(),
                theme: Some(theme),
            },
        });
        first
    }

    /// Remove every theme contributed by `id`. Returns `false` if there were none.
    pub fn unregister_theme(&self, id: &str) -> bool {
        let snapshot = {
            let mut themes = self.themes.write().unwrap_or_else(PoisonError::into_inner);
            if themes.remove(id).is_none() {
                return false;
            }
            themes.clone()
        };

        tracing::debug!(plugin = %id, "Themes unregistered");
        self.events.emit(HostEvent::ThemeChanged {
            themes: snapshot,
            delta: ThemeDelta {
                id: id.to_string(),
                theme: None,
            },
        });
        true
    }

    /// Apply a theme through the host surface; `None` restores the default.
    ///
    /// With `persist` set the selection is written to the user preferences.
    pub async fn select_theme(
        &self,
        theme: Option<ThemeDescriptor>,
        persist: bool,
    ) -> Result<(), PluginError> {
        self.surface.inject_theme(theme.as_ref()).await?;

        if persist {
            let selected = theme.clone();
            self.preferences
                .save(move |prefs| prefs.theme = selected)
                .await;
        }

        self.events.emit(HostEvent::ThemeSelected { theme });
        Ok(())
    }

    /// Re-apply the persisted theme selection, if any
    pub async fn activate_user_preferences(&self) {
        let Some(theme) = self.preferences.theme() else {
            return;
        };
        if let Err(e) = self.select_theme(Some(theme), false).await {
            tracing::warn!(error = %e, "Failed to restore selected theme");
        }
    }

    /// Snapshot of all contributions
    pub fn themes(&self) -> ThemeMap {
        self.themes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn themes_of(&self, id: &str) -> Vec<ThemeDescriptor> {
        self.themes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryHostBridge;
    use crate::mock::RecordingSurface;

    fn registry() -> (ThemeRegistry, Arc<RecordingSurface>, Arc<MemoryHostBridge>) {
        let bridge = Arc::new(MemoryHostBridge::new());
        let surface = Arc::new(RecordingSurface::new());
        let preferences = Arc::new(PreferenceStore::new(bridge.clone()));
        let themes = ThemeRegistry::new(surface.clone(), preferences, EventEmitter::new(16));
        (themes, surface, bridge)
    }

    #[tokio::test]
    async fn test_register_reports_first_contribution_and_emits() {
        let (themes, _, _) = registry();
        let mut rx = themes.subscribe();

        assert!(themes.register_theme("p1", ThemeDescriptor::with_url("a.css")));
        assert!(!themes.register_theme("p1", ThemeDescriptor::with_url("b.css")));
        assert_eq!(themes.themes_of("p1").len(), 2);

        match rx.recv().await.unwrap() {
            HostEvent::ThemeChanged { themes, delta } => {
                assert_eq!(delta.id, "p1");
                assert_eq!(themes["p1"].len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_empty_id_is_ignored() {
        let (themes, _, _) = registry();
        assert!(!themes.register_theme("", ThemeDescriptor::with_url("a.css")));
        assert!(themes.themes().is_empty());
    }

    #[tokio::test]
    async fn test_unregister_removes_all_contributions() {
        let (themes, _, _) = registry();
        themes.register_theme("p1", ThemeDescriptor::with_url("a.css"));
        themes.register_theme("p2", ThemeDescriptor::with_url("b.css"));
        let mut rx = themes.subscribe();

        assert!(themes.unregister_theme("p1"));
        assert!(!themes.unregister_theme("p1"));

        match rx.recv().await.unwrap() {
            HostEvent::ThemeChanged { themes, delta } => {
                assert!(delta.theme.is_none());
                assert!(!themes.contains_key("p1"));
                assert!(themes.contains_key("p2"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_select_theme_injects_and_persists() {
        let (themes, surface, bridge) = registry();
        let theme = ThemeDescriptor::with_url("dark.css");

        themes.select_theme(Some(theme.clone()), true).await.unwrap();

        assert_eq!(surface.themes(), vec![Some(theme.clone())]);
        assert_eq!(bridge.preferences().unwrap().theme, Some(theme));
    }

    #[tokio::test]
    async fn test_select_theme_without_persist_leaves_preferences() {
        let (themes, surface, bridge) = registry();

        themes.select_theme(None, false).await.unwrap();

        assert_eq!(surface.themes(), vec![None]);
        assert!(bridge.preferences().is_none());
    }
}
