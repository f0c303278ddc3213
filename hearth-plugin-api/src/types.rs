//! Plugin manifest and shell layout types

use serde::{Deserialize, Serialize};

use crate::token::Token;

/// Static declaration of a plugin's identity and dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin id, e.g. `hearth-demo:paths`
    pub id: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Capabilities that must be available before activation
    #[serde(default)]
    pub requires: Vec<String>,
    /// Capabilities passed when available, absent otherwise
    #[serde(default)]
    pub optional: Vec<String>,
    /// Capability this plugin registers an instance for
    #[serde(default)]
    pub provides: Option<String>,
    /// Activate during bootstrap; `false` means activate on demand only
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

fn default_auto_start() -> bool {
    true
}

impl PluginManifest {
    /// Manifest with no dependencies that starts automatically
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            requires: Vec::new(),
            optional: Vec::new(),
            provides: None,
            auto_start: true,
        }
    }

    /// Builder: set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: add a required capability
    pub fn requires<T>(mut self, token: &Token<T>) -> Self {
        self.requires.push(token.name().to_string());
        self
    }

    /// Builder: add an optional capability
    pub fn optional<T>(mut self, token: &Token<T>) -> Self {
        self.optional.push(token.name().to_string());
        self
    }

    /// Builder: declare the provided capability
    pub fn provides<T>(mut self, token: &Token<T>) -> Self {
        self.provides = Some(token.name().to_string());
        self
    }

    /// Builder: set the auto-start flag
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Required and optional capabilities, required first
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, bool)> {
        self.requires
            .iter()
            .map(|c| (c.as_str(), true))
            .chain(self.optional.iter().map(|c| (c.as_str(), false)))
    }
}

/// Named region of the application shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellArea {
    Top,
    Menu,
    Left,
    Main,
    Right,
    Down,
}

impl ShellArea {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Menu => "menu",
            Self::Left => "left",
            Self::Main => "main",
            Self::Right => "right",
            Self::Down => "down",
        }
    }
}

/// An item a plugin attaches to the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellItem {
    /// Item identifier, e.g. `logo` or `spacer`
    pub id: String,
    /// Target area
    pub area: ShellArea,
    /// Position within the area, lower ranks first
    pub rank: i32,
}
