//! hearth-plugin-api - Plugin API for the hearth application kernel
//!
//! This crate provides the traits and types needed to write plugins for
//! hearth. A plugin declares which capabilities it requires, which it can
//! use when present, and at most one capability it provides. The kernel
//! activates plugins in dependency order and hands each one the services it
//! asked for.
//!
//! # Example
//!
//! ```
//! use hearth_plugin_api::{
//!     Activated, ActivationContext, Plugin, PluginError, PluginManifest, Token,
//! };
//!
//! pub struct Paths {
//!     pub base_url: String,
//! }
//!
//! pub const PATHS: Token<Paths> = Token::new("example:paths");
//!
//! pub struct PathsPlugin;
//!
//! impl Plugin for PathsPlugin {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::new("example:paths").provides(&PATHS)
//!     }
//!
//!     fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
//!         ctx.log_info("providing paths");
//!         Ok(Activated::provide(&PATHS, Paths { base_url: "/".into() }))
//!     }
//! }
//! ```

pub mod command;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod token;
pub mod types;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

pub use command::{Command, CommandArgs, CommandExecutor, CommandHandler, CommandOutput};
pub use context::{ActivationContext, AppHandle, PluginSettings, RouteSpec};
pub use error::PluginError;
pub use lifecycle::{ReadinessGate, ReadySignal};
pub use token::{Service, Token};
pub use types::{PluginManifest, ShellArea, ShellItem};

/// Asynchronous follow-up work of an activation
pub type ActivationTask = BoxFuture<'static, Result<(), PluginError>>;

/// The core plugin trait - implement this to create a hearth plugin.
///
/// `activate` is synchronous: whatever the plugin provides is returned
/// directly and registered before any dependent runs. Work that has to wait
/// on something asynchronous is returned as a task with
/// [`Activated::with_task`].
pub trait Plugin: Send + Sync {
    /// Return the plugin declaration
    fn manifest(&self) -> PluginManifest;

    /// Called exactly once, after every required capability is available
    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError>;
}

/// Result of a successful activation
#[derive(Default)]
pub struct Activated {
    service: Option<Service>,
    task: Option<ActivationTask>,
}

impl Activated {
    /// Nothing provided, nothing pending
    pub fn none() -> Self {
        Self::default()
    }

    /// Provide an instance for `token`
    pub fn provide<T: Any + Send + Sync>(token: &Token<T>, value: T) -> Self {
        Self {
            service: Some(token.provide(value)),
            task: None,
        }
    }

    /// Provide a shared instance for `token`
    pub fn provide_arc<T: Any + Send + Sync>(token: &Token<T>, value: Arc<T>) -> Self {
        Self {
            service: Some(token.provide_arc(value)),
            task: None,
        }
    }

    /// Builder: attach asynchronous follow-up work
    pub fn with_task<F>(mut self, task: F) -> Self
    where
        F: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        self.task = Some(task.boxed());
        self
    }

    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// Split into the provided service and the pending task
    pub fn into_parts(self) -> (Option<Service>, Option<ActivationTask>) {
        (self.service, self.task)
    }
}

impl fmt::Debug for Activated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activated")
            .field("service", &self.service)
            .field("task", &self.task.is_some())
            .finish()
    }
}
