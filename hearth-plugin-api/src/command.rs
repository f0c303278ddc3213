//! Command types for plugin registration

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::PluginError;

/// Boxed asynchronous command handler
pub type CommandHandler =
    Arc<dyn Fn(CommandArgs) -> BoxFuture<'static, Result<CommandOutput, PluginError>> + Send + Sync>;

/// Synchronous state query (toggled, enabled)
pub type StateQuery = Arc<dyn Fn() -> bool + Send + Sync>;

/// A command a plugin adds to the application
///
/// # Example
///
/// ```
/// use hearth_plugin_api::{Command, CommandOutput};
///
/// let command = Command::new("tree:open", |args| async move {
///     Ok(CommandOutput::Text(format!("opening {}", args.arg(0))))
/// })
/// .label("Open the file browser");
/// assert_eq!(command.id(), "tree:open");
/// ```
#[derive(Clone)]
pub struct Command {
    id: String,
    label: String,
    caption: String,
    execute: CommandHandler,
    is_toggled: Option<StateQuery>,
    is_enabled: Option<StateQuery>,
}

impl Command {
    /// Create a command from an async handler
    pub fn new<F, Fut>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CommandArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CommandOutput, PluginError>> + Send + 'static,
    {
        let execute: CommandHandler = Arc::new(move |args| handler(args).boxed());
        Self {
            id: id.into(),
            label: String::new(),
            caption: String::new(),
            execute,
            is_toggled: None,
            is_enabled: None,
        }
    }

    /// Builder: set the human readable label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder: set the longer caption
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Builder: report a toggled state (checkbox style commands)
    pub fn toggled(mut self, query: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_toggled = Some(Arc::new(query));
        self
    }

    /// Builder: report whether the command can currently run
    pub fn enabled(mut self, query: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_enabled = Some(Arc::new(query));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label_text(&self) -> &str {
        &self.label
    }

    pub fn caption_text(&self) -> &str {
        &self.caption
    }

    /// Current toggled state, `false` for commands without one
    pub fn is_toggled(&self) -> bool {
        self.is_toggled.as_ref().is_some_and(|query| query())
    }

    /// Whether the command can currently run, `true` unless a query says otherwise
    pub fn is_enabled(&self) -> bool {
        self.is_enabled.as_ref().is_none_or(|query| query())
    }

    /// Start the handler. The returned future owns everything it needs.
    pub fn invoke(&self, args: CommandArgs) -> BoxFuture<'static, Result<CommandOutput, PluginError>> {
        (self.execute)(args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Arguments passed to a command handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    /// Positional arguments
    pub args: Vec<String>,
    /// Named arguments
    pub flags: HashMap<String, String>,
}

impl CommandArgs {
    /// Positional arguments only
    pub fn positional(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            flags: HashMap::new(),
        }
    }

    /// Positional argument at `index`, empty when missing
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or("")
    }

    /// Named argument
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }
}

/// Output from a command handler
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Plain text output
    Text(String),
    /// Success with no output
    Success,
}

/// Executes commands by id; implemented by the application's command registry.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a registered command
    async fn execute(&self, id: &str, args: CommandArgs) -> Result<CommandOutput, PluginError>;

    /// Whether a command with this id is registered
    fn has_command(&self, id: &str) -> bool;
}
