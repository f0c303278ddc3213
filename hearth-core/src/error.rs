//! Error types for hearth-core

use hearth_plugin_api::PluginError;
use thiserror::Error;

/// Result alias for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Top-level error type for hearth-core
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Activation error: {0}")]
    Activation(#[from] ActivationError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Application already started")]
    AlreadyStarted,
}

/// Errors from the service registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Capability '{capability}' is already registered")]
    DuplicateCapability { capability: String },

    #[error("Capability '{capability}' is not registered")]
    UnresolvedCapability { capability: String },

    #[error("Capability '{capability}' has type {found}, expected {expected}")]
    TypeMismatch {
        capability: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors found while resolving the plugin graph. None of these activate anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Plugin '{id}' is registered more than once")]
    DuplicatePlugin { id: String },

    #[error("Plugin '{id}' is not registered")]
    UnknownPlugin { id: String },

    #[error("Plugin '{id}' is disabled")]
    DisabledPlugin { id: String },

    #[error("Capability '{capability}' is provided by more than one plugin: {}", providers.join(", "))]
    DuplicateCapability {
        capability: String,
        providers: Vec<String>,
    },

    #[error("Cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Plugin '{plugin}' requires '{capability}' but no plugin provides it")]
    MissingProvider { plugin: String, capability: String },
}

/// Errors from activating a single plugin
#[derive(Error, Debug)]
pub enum ActivationError {
    #[error("Plugin '{plugin}' failed to activate: {source}")]
    Failed {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("Plugin '{plugin}' panicked during activation")]
    Panicked { plugin: String },

    #[error(
        "Plugin '{plugin}' broke its provider contract: declared {}, returned {}",
        expected.as_deref().unwrap_or("nothing"),
        found.as_deref().unwrap_or("nothing")
    )]
    ProviderContractViolation {
        plugin: String,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("Plugin '{plugin}' requires '{capability}' whose provider is unavailable: {reason}")]
    MissingProvider {
        plugin: String,
        capability: String,
        reason: String,
    },

    #[error("Plugin '{plugin}' previously failed: {reason}")]
    PreviouslyFailed { plugin: String, reason: String },

    #[error("Plugin '{plugin}' registers command '{command}' which already exists")]
    CommandConflict { plugin: String, command: String },

    #[error("Plugin '{plugin}' registers an invalid route: {source}")]
    InvalidRoute {
        plugin: String,
        #[source]
        source: RouterError,
    },

    #[error("Plugin '{plugin}' could not register its service: {source}")]
    Service {
        plugin: String,
        #[source]
        source: ServiceError,
    },
}

impl ActivationError {
    /// Id of the plugin this error is about
    pub fn plugin(&self) -> &str {
        match self {
            Self::Failed { plugin, .. }
            | Self::Panicked { plugin }
            | Self::ProviderContractViolation { plugin, .. }
            | Self::MissingProvider { plugin, .. }
            | Self::PreviouslyFailed { plugin, .. }
            | Self::CommandConflict { plugin, .. }
            | Self::InvalidRoute { plugin, .. }
            | Self::Service { plugin, .. } => plugin,
        }
    }
}

/// Errors from the command registry
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command '{id}' is not registered")]
    Unknown { id: String },

    #[error("Command '{id}' is already registered")]
    Duplicate { id: String },

    #[error("Command '{id}' is disabled")]
    Disabled { id: String },

    #[error("Command '{id}' failed: {source}")]
    Failed {
        id: String,
        #[source]
        source: PluginError,
    },
}

/// Errors from the router
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Route handler '{command}' for '{path}' failed: {source}")]
    HandlerFailure {
        command: String,
        path: String,
        #[source]
        source: CommandError,
    },

    #[error("Route handler '{command}' for '{path}' panicked")]
    HandlerPanicked { command: String, path: String },
}

/// Errors loading or saving the kernel config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
