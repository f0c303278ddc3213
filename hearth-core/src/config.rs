//! Kernel configuration
//!
//! Stored as TOML, by default in `~/.config/hearth/config.toml`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use hearth_plugin_api::PluginSettings;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What bootstrap does when an auto-start plugin has no provider for a
/// required capability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProviderPolicy {
    /// Abort bootstrap before anything is activated
    #[default]
    Fatal,
    /// Mark the plugin and its dependents failed and continue
    Isolate,
}

/// Plugin enablement and settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugins left out of resolution entirely
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
    /// Auto-start plugins activated on demand only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<String>,
    /// Per-plugin settings tables, keyed by plugin id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

/// Router settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Prefix stripped from every routed path
    #[serde(default = "default_root")]
    pub base_url: String,
    /// Location routed once the application has started
    #[serde(default = "default_root")]
    pub initial_path: String,
}

fn default_root() -> String {
    "/".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_root(),
            initial_path: default_root(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub missing_provider: MissingProviderPolicy,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            missing_provider: MissingProviderPolicy::default(),
            plugins: PluginsConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        hearth_paths::config_file()
    }

    /// Load from a TOML file
    ///
    /// Returns the default config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.plugins.disabled.iter().any(|p| p == id)
    }

    pub fn is_deferred(&self, id: &str) -> bool {
        self.plugins.deferred.iter().any(|p| p == id)
    }

    /// Disable a plugin
    pub fn disable(&mut self, id: &str) {
        if !self.is_disabled(id) {
            self.plugins.disabled.push(id.to_string());
        }
    }

    /// Enable a plugin, undoing `disable` and `defer`
    pub fn enable(&mut self, id: &str) {
        self.plugins.disabled.retain(|p| p != id);
        self.plugins.deferred.retain(|p| p != id);
    }

    /// Activate a plugin on demand only
    pub fn defer(&mut self, id: &str) {
        if !self.is_deferred(id) {
            self.plugins.deferred.push(id.to_string());
        }
    }

    /// Settings handed to the plugin's activation
    pub fn settings_for(&self, id: &str) -> PluginSettings {
        let values: HashMap<String, toml::Value> = self
            .plugins
            .settings
            .get(id)
            .map(|table| table.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        PluginSettings::new(values)
    }
}
