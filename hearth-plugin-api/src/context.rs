//! ActivationContext - a plugin's interface to the application during activation

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::command::{Command, CommandArgs, CommandExecutor, CommandOutput};
use crate::error::PluginError;
use crate::lifecycle::ReadySignal;
use crate::token::{Service, Token};
use crate::types::{ShellArea, ShellItem};

/// Specification for a URL route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// Regular expression matched against the whole path, e.g. `/notebooks/(.*)`
    pub pattern: String,
    /// Command executed when the pattern matches
    pub command: String,
}

impl RouteSpec {
    pub fn new(pattern: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            command: command.into(),
        }
    }
}

/// Cloneable handle to the running application.
///
/// Command handlers keep a clone to run other commands or to wait for the
/// application to finish starting before acting.
#[derive(Clone)]
pub struct AppHandle {
    name: String,
    commands: Arc<dyn CommandExecutor>,
    started: ReadySignal,
    restored: ReadySignal,
}

impl AppHandle {
    pub fn new(
        name: impl Into<String>,
        commands: Arc<dyn CommandExecutor>,
        started: ReadySignal,
        restored: ReadySignal,
    ) -> Self {
        Self {
            name: name.into(),
            commands,
            started,
            restored,
        }
    }

    /// Application name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves once bootstrap has activated every auto-start plugin
    pub fn started(&self) -> &ReadySignal {
        &self.started
    }

    /// Resolves once the background work of every activation has finished
    pub fn restored(&self) -> &ReadySignal {
        &self.restored
    }

    /// Run a registered command
    pub async fn execute(&self, id: &str, args: CommandArgs) -> Result<CommandOutput, PluginError> {
        self.commands.execute(id, args).await
    }

    /// Whether a command is registered
    pub fn has_command(&self, id: &str) -> bool {
        self.commands.has_command(id)
    }
}

impl fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppHandle")
            .field("name", &self.name)
            .field("started", &self.started.is_ready())
            .field("restored", &self.restored.is_ready())
            .finish_non_exhaustive()
    }
}

/// Read-only per-plugin settings, taken from the application config file
#[derive(Debug, Clone, Default)]
pub struct PluginSettings {
    values: HashMap<String, toml::Value>,
}

impl PluginSettings {
    pub fn new(values: HashMap<String, toml::Value>) -> Self {
        Self { values }
    }

    /// Read a setting, `None` when missing or of another type
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything a plugin receives when it is activated.
///
/// Services are resolved by the host before `activate` runs. Commands,
/// routes and shell items added here are pending until `activate` returns
/// successfully; the host then validates and commits them together.
pub struct ActivationContext {
    plugin_id: String,
    app: AppHandle,
    settings: PluginSettings,
    required: HashMap<String, Service>,
    optional: HashMap<String, Option<Service>>,
    pending_commands: Vec<Command>,
    pending_routes: Vec<RouteSpec>,
    pending_shell_items: Vec<ShellItem>,
}

impl ActivationContext {
    /// Create a context (used by the plugin host)
    pub fn new(
        plugin_id: impl Into<String>,
        app: AppHandle,
        required: HashMap<String, Service>,
        optional: HashMap<String, Option<Service>>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            app,
            settings: PluginSettings::default(),
            required,
            optional,
            pending_commands: Vec::new(),
            pending_routes: Vec::new(),
            pending_shell_items: Vec::new(),
        }
    }

    /// Builder: attach plugin settings
    pub fn with_settings(mut self, settings: PluginSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn app(&self) -> &AppHandle {
        &self.app
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    // ─── Services ────────────────────────────────────────────────────

    /// A required service. Fails only when the capability was not declared
    /// in `requires` or was registered with another type.
    pub fn required<T: std::any::Any + Send + Sync>(
        &self,
        token: &Token<T>,
    ) -> Result<Arc<T>, PluginError> {
        let service = self
            .required
            .get(token.name())
            .ok_or_else(|| PluginError::UnresolvedCapability(token.name().to_string()))?;
        token.downcast(service)
    }

    /// An optional service, `None` when no provider is active
    pub fn optional<T: std::any::Any + Send + Sync>(&self, token: &Token<T>) -> Option<Arc<T>> {
        let service = self.optional.get(token.name())?.as_ref()?;
        match token.downcast(service) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(plugin = %self.plugin_id, error = %e, "Ignoring optional service");
                None
            }
        }
    }

    // ─── Command Registration ────────────────────────────────────────

    /// Add a command to the application.
    ///
    /// Returns error if this plugin already added a command with the same id.
    pub fn add_command(&mut self, command: Command) -> Result<(), PluginError> {
        if self.pending_commands.iter().any(|c| c.id() == command.id()) {
            return Err(PluginError::DuplicateCommand(command.id().to_string()));
        }
        self.pending_commands.push(command);
        Ok(())
    }

    /// Commands pending registration
    pub fn pending_commands(&self) -> &[Command] {
        &self.pending_commands
    }

    /// Take pending commands (used by the host after validation)
    pub fn take_pending_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    // ─── Route Registration ──────────────────────────────────────────

    /// Register a URL route.
    ///
    /// Returns error if this plugin already registered the same pattern.
    pub fn register_route(&mut self, spec: RouteSpec) -> Result<(), PluginError> {
        if self.pending_routes.iter().any(|r| r.pattern == spec.pattern) {
            return Err(PluginError::DuplicateRoute(spec.pattern));
        }
        self.pending_routes.push(spec);
        Ok(())
    }

    /// Routes pending registration
    pub fn pending_routes(&self) -> &[RouteSpec] {
        &self.pending_routes
    }

    /// Take pending routes (used by the host after validation)
    pub fn take_pending_routes(&mut self) -> Vec<RouteSpec> {
        std::mem::take(&mut self.pending_routes)
    }

    // ─── Shell Layout ────────────────────────────────────────────────

    /// Attach an item to a shell area
    pub fn add_to_shell(&mut self, id: impl Into<String>, area: ShellArea, rank: i32) {
        self.pending_shell_items.push(ShellItem {
            id: id.into(),
            area,
            rank,
        });
    }

    /// Take pending shell items (used by the host)
    pub fn take_pending_shell_items(&mut self) -> Vec<ShellItem> {
        std::mem::take(&mut self.pending_shell_items)
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically tagged with the plugin id)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_id, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_id, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_id, "{}", message);
    }
}
