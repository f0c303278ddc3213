//! XDG Base Directory paths for hearth.
//!
//! The CLI keeps its configuration under the XDG config directory on every
//! platform, like most command line tools do.

use std::path::PathBuf;

const APP_DIR: &str = "hearth";

/// Get the hearth config directory.
///
/// Returns `$XDG_CONFIG_HOME/hearth` if set, otherwise `~/.config/hearth`.
///
/// # Examples
///
/// ```
/// use hearth_paths::config_dir;
///
/// let config = config_dir();
/// assert!(config.ends_with("hearth"));
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP_DIR)
    } else {
        PathBuf::from(".config").join(APP_DIR)
    }
}

/// Default location of the kernel config file
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
