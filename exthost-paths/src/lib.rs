//! On-disk locations used by the exthost extension host.
//!
//! Everything lives under a single config root. Plugin sources under that
//! root count as local; anything else is remembered as an external plugin.

use std::path::PathBuf;

const APP_DIR: &str = "exthost";

/// `$XDG_CONFIG_HOME`, else `~/.config`, else a relative `.config`
fn config_home() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
}

/// The local user-config root.
///
/// ```
/// let root = exthost_paths::config_dir();
/// assert!(root.ends_with("exthost"));
/// ```
pub fn config_dir() -> PathBuf {
    config_home().join(APP_DIR)
}

/// One JSON file per plugin, named by its settings key
pub fn settings_dir() -> PathBuf {
    config_dir().join("settings")
}

/// Selected theme and remembered external sources
pub fn preferences_path() -> PathBuf {
    config_dir().join("preferences.json")
}

pub fn host_config_path() -> PathBuf {
    config_dir().join("exthost.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_share_the_config_root() {
        assert!(settings_dir().ends_with("exthost/settings"));
        assert!(preferences_path().ends_with("exthost/preferences.json"));
        assert!(host_config_path().ends_with("exthost/exthost.toml"));
    }

    #[test]
    fn test_xdg_config_home_moves_the_root() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/srv/host-config");
        }
        let root = config_dir();
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
        assert_eq!(root, PathBuf::from("/srv/host-config/exthost"));
    }
}
