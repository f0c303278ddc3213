//! Command registry for plugin commands
//!
//! Commands are added by plugins during activation and executed by id,
//! either directly through the [`AppHandle`](hearth_plugin_api::AppHandle)
//! or by the router when a pattern matches.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use hearth_plugin_api::{Command, CommandArgs, CommandExecutor, CommandOutput, PluginError};

use crate::error::CommandError;

/// A command registered by a plugin
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    /// Id of the plugin that owns this command
    pub plugin: String,
    pub command: Command,
}

/// Summary of a registered command, for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: String,
    pub label: String,
    pub plugin: String,
}

#[derive(Debug, Default)]
struct CommandTable {
    by_id: HashMap<String, RegisteredCommand>,
    order: Vec<String>,
}

/// Registry of all commands, shared between the host, the router and
/// application handles
#[derive(Debug, Default)]
pub struct CommandRegistry {
    table: RwLock<CommandTable>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner of a command id, if registered
    pub fn check_conflict(&self, id: &str) -> Option<String> {
        self.read(|table| table.by_id.get(id).map(|c| c.plugin.clone()))
    }

    /// Register commands for a plugin.
    ///
    /// All ids are checked before any command is added.
    pub fn register(&self, plugin: &str, commands: Vec<Command>) -> Result<(), CommandError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = commands.iter().find(|c| table.by_id.contains_key(c.id())) {
            return Err(CommandError::Duplicate {
                id: existing.id().to_string(),
            });
        }
        for command in commands {
            let id = command.id().to_string();
            tracing::debug!(plugin, command = %id, "Command registered");
            table.order.push(id.clone());
            table.by_id.insert(
                id,
                RegisteredCommand {
                    plugin: plugin.to_string(),
                    command,
                },
            );
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read(|table| table.by_id.contains_key(id))
    }

    /// Clone of a registered command
    pub fn get(&self, id: &str) -> Option<Command> {
        self.read(|table| table.by_id.get(id).map(|c| c.command.clone()))
    }

    /// All commands in registration order
    pub fn list(&self) -> Vec<CommandInfo> {
        self.read(|table| {
            table
                .order
                .iter()
                .filter_map(|id| table.by_id.get(id))
                .map(|c| CommandInfo {
                    id: c.command.id().to_string(),
                    label: c.command.label_text().to_string(),
                    plugin: c.plugin.clone(),
                })
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.read(|table| table.by_id.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute a command. The lock is released before the handler runs.
    pub async fn run(&self, id: &str, args: CommandArgs) -> Result<CommandOutput, CommandError> {
        let command = self.get(id).ok_or_else(|| CommandError::Unknown { id: id.to_string() })?;
        if !command.is_enabled() {
            return Err(CommandError::Disabled { id: id.to_string() });
        }
        command.invoke(args).await.map_err(|source| CommandError::Failed {
            id: id.to_string(),
            source,
        })
    }

    fn read<R>(&self, f: impl FnOnce(&CommandTable) -> R) -> R {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        f(&table)
    }
}

#[async_trait]
impl CommandExecutor for CommandRegistry {
    async fn execute(&self, id: &str, args: CommandArgs) -> Result<CommandOutput, PluginError> {
        self.run(id, args).await.map_err(|e| match e {
            CommandError::Unknown { id } => PluginError::UnknownCommand(id),
            CommandError::Failed { source, .. } => source,
            other => PluginError::command(other.to_string()),
        })
    }

    fn has_command(&self, id: &str) -> bool {
        self.contains(id)
    }
}
