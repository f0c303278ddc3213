//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins and command handlers can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Command execution failed
    #[error("Command failed: {0}")]
    Command(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),

    /// Duplicate command registration
    #[error("Duplicate command: {0}")]
    DuplicateCommand(String),

    /// Duplicate route registration
    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    /// Unknown command dispatch
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A mandatory capability was not handed to the plugin
    #[error("Unresolved capability: {0}")]
    UnresolvedCapability(String),

    /// A capability instance has a different type than the token expects
    #[error("Capability '{capability}' has type {found}, expected {expected}")]
    TypeMismatch {
        capability: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a command error
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }
}
