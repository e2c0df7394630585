//! Package manifest parsing and resource resolution
//!
//! Only the fields the host consumes are typed; everything else is kept
//! verbatim so writing the manifest back never loses data.

use std::path::{Component, Path, PathBuf};

use exthost_api::{SandboxMode, ThemeDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::options::PluginOptions;
use crate::error::PluginError;

/// File name of a package manifest inside its source directory
pub const MANIFEST_FILE: &str = "package.json";

/// Location prefixes that are already fully resolved
const RESOLVED_SCHEMES: [&str; 3] = ["http", "file", "assets"];

/// One theme or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeList {
    Many(Vec<ThemeDescriptor>),
    One(ThemeDescriptor),
}

impl ThemeList {
    pub fn into_vec(self) -> Vec<ThemeDescriptor> {
        match self {
            Self::Many(themes) => themes,
            Self::One(theme) => vec![theme],
        }
    }
}

/// The host-specific configuration block nested in a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginBlock {
    /// Identity override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SandboxMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<ThemeList>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed `package.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Either a string or an object with a `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Entry file, relative to the package root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginBlock>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageManifest {
    /// Parse raw manifest text
    pub fn parse(raw: &str) -> Result<Self, PluginError> {
        if raw.trim().is_empty() {
            return Err(PluginError::IllegalPackage("empty package config".to_string()));
        }
        serde_json::from_str(raw)
            .map_err(|e| PluginError::IllegalPackage(format!("parse package config: {}", e)))
    }

    /// Identity declared in the plugin block
    pub fn declared_id(&self) -> Option<&str> {
        self.plugin
            .as_ref()
            .and_then(|block| block.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Record a generated identity in the plugin block
    pub fn assign_id(&mut self, id: &str) {
        self.plugin.get_or_insert_with(PluginBlock::default).id = Some(id.to_string());
    }

    pub fn author_name(&self) -> Option<String> {
        match self.author.as_ref()? {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => fields.get("name").and_then(Value::as_str).map(String::from),
            _ => None,
        }
    }

    /// Copy descriptive fields, entry point, icon and sandbox mode into `options`
    pub fn apply_to(&self, options: &mut PluginOptions, root: &str) {
        if let Some(name) = &self.name {
            options.name = name.clone();
        }
        if let Some(version) = &self.version {
            options.version = version.clone();
        }
        if let Some(author) = self.author_name() {
            options.author = Some(author);
        }
        if let Some(description) = &self.description {
            options.description = Some(description.clone());
        }
        if let Some(main) = &self.main {
            options.entry = Some(resolve_location(root, main, true));
        }
        if let Some(icon) = &self.icon {
            options.icon = Some(resolve_location(root, icon, false));
        }
        if let Some(mode) = self.plugin.as_ref().and_then(|block| block.mode) {
            options.mode = mode;
        }
    }

    /// Declared themes with their URLs resolved against `root`.
    ///
    /// Themes without a URL are dropped.
    pub fn themes(&self, root: &str) -> Vec<ThemeDescriptor> {
        self.plugin
            .as_ref()
            .and_then(|block| block.themes.clone())
            .map(ThemeList::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|mut theme| {
                let url = theme.url.take()?;
                theme.url = Some(resolve_theme_url(Some(root), &url));
                Some(theme)
            })
            .collect()
    }

    pub fn to_value(&self) -> Result<Value, PluginError> {
        serde_json::to_value(self).map_err(|e| PluginError::IllegalPackage(e.to_string()))
    }
}

fn has_resolved_scheme(location: &str) -> bool {
    RESOLVED_SCHEMES
        .iter()
        .any(|scheme| location.starts_with(scheme))
}

/// Join `location` onto `root`, normalizing `.` and `..` segments
fn join_path(root: &str, location: &str) -> String {
    let mut joined = PathBuf::from(root);
    for component in Path::new(location).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::ParentDir => {
                joined.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    joined.to_string_lossy().into_owned()
}

/// Full location of a package resource.
///
/// Relative locations are joined onto the package root and given the
/// `file://` protocol. With `file_protocol` unset the result uses the
/// `assets:` protocol instead, which is how the host serves static files.
pub fn resolve_location(root: &str, location: &str, file_protocol: bool) -> String {
    let mut location = location.to_string();
    if !has_resolved_scheme(&location) {
        let joined = join_path(root, &location);
        location = if has_resolved_scheme(&joined) {
            joined
        } else {
            format!("file://{}", joined)
        };
    }

    if file_protocol {
        location
    } else {
        location.replacen("file:", "assets:", 1)
    }
}

/// Full location of a package theme stylesheet
pub fn resolve_theme_url(root: Option<&str>, url: &str) -> String {
    match root {
        Some(root) if !url.starts_with("http") => {
            let joined = join_path(root, url);
            if joined.starts_with("file:") {
                joined
            } else {
                format!("assets://{}", joined)
            }
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_empty_and_invalid_text() {
        assert!(matches!(
            PackageManifest::parse("  "),
            Err(PluginError::IllegalPackage(_))
        ));
        assert!(matches!(
            PackageManifest::parse("{not json"),
            Err(PluginError::IllegalPackage(_))
        ));
        assert!(matches!(
            PackageManifest::parse("null"),
            Err(PluginError::IllegalPackage(_))
        ));
    }

    #[test]
    fn test_resolve_location_for_entry_and_icon() {
        assert_eq!(
            resolve_location("/plugins/p1", "./dist/index.html", true),
            "file:///plugins/p1/dist/index.html"
        );
        assert_eq!(
            resolve_location("/plugins/p1", "icon.png", false),
            "assets:///plugins/p1/icon.png"
        );
        assert_eq!(
            resolve_location("/plugins/p1", "https://cdn.example.com/icon.png", false),
            "https://cdn.example.com/icon.png"
        );
    }

    #[test]
    fn test_resolve_theme_url_prefixes_assets_protocol() {
        assert_eq!(
            resolve_theme_url(Some("/plugins/nord"), "nord.css"),
            "assets:///plugins/nord/nord.css"
        );
        assert_eq!(
            resolve_theme_url(Some("/plugins/nord"), "http://example.com/nord.css"),
            "http://example.com/nord.css"
        );
        assert_eq!(resolve_theme_url(None, "nord.css"), "nord.css");
    }

    #[test]
    fn test_apply_to_copies_allow_listed_fields() {
        let manifest = PackageManifest::parse(
            &json!({
                "name": "journals-calendar",
                "version": "1.2.0",
                "author": {"name": "hulk", "email": "hulk@example.com"},
                "description": "Calendar view",
                "icon": "./icon.svg",
                "main": "index.html",
                "license": "MIT",
                "plugin": {"id": "calendar", "mode": "shadow"}
            })
            .to_string(),
        )
        .unwrap();

        let mut options = PluginOptions::from_source("/plugins/calendar");
        manifest.apply_to(&mut options, "/plugins/calendar");

        assert_eq!(options.name, "journals-calendar");
        assert_eq!(options.version, "1.2.0");
        assert_eq!(options.author.as_deref(), Some("hulk"));
        assert_eq!(options.description.as_deref(), Some("Calendar view"));
        assert_eq!(
            options.entry.as_deref(),
            Some("file:///plugins/calendar/index.html")
        );
        assert_eq!(
            options.icon.as_deref(),
            Some("assets:///plugins/calendar/icon.svg")
        );
        assert_eq!(options.mode, SandboxMode::Shadow);
        assert_eq!(manifest.declared_id(), Some("calendar"));
    }

    #[test]
    fn test_assign_id_preserves_unknown_fields() {
        let mut manifest =
            PackageManifest::parse(r#"{"name": "p", "license": "MIT", "plugin": {"color": "red"}}"#)
                .unwrap();
        assert_eq!(manifest.declared_id(), None);

        manifest.assign_id("generated-id");

        let value = manifest.to_value().unwrap();
        assert_eq!(value["license"], "MIT");
        assert_eq!(value["plugin"]["id"], "generated-id");
        assert_eq!(value["plugin"]["color"], "red");
    }

    #[test]
    fn test_themes_accepts_single_or_list_and_drops_urlless() {
        let single =
            PackageManifest::parse(r#"{"plugin": {"themes": {"name": "Nord", "url": "nord.css"}}}"#)
                .unwrap();
        let themes = single.themes("/plugins/nord");
        assert_eq!(themes.len(), 1);
        assert_eq!(
            themes[0].url.as_deref(),
            Some("assets:///plugins/nord/nord.css")
        );

        let list = PackageManifest::parse(
            r#"{"plugin": {"themes": [{"name": "Light", "url": "light.css"}, {"name": "Broken"}]}}"#,
        )
        .unwrap();
        let themes = list.themes("/plugins/pack");
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].name.as_deref(), Some("Light"));
    }
}
