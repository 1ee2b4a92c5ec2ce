//! XDG path helpers.

use directories::BaseDirs;
use std::path::PathBuf;

pub const APP_DIR: &str = "letterflow";

/// `$XDG_CONFIG_HOME`, else `~/.config`.
pub fn config_home() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|dir| !dir.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".config"))
}

/// `<config home>/letterflow/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|home| home.join(APP_DIR).join("config.toml"))
}
