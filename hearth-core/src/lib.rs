//! hearth-core: Core library for the hearth application kernel
//!
//! This crate assembles independently written plugins into one running
//! application:
//!
//! - **Graph resolution** - [`plugins::graph`] orders plugins so every
//!   provider activates before the plugins that require it
//! - **Activation** - [`PluginHost`] activates each plugin exactly once and
//!   registers the service it provides in the [`ServiceRegistry`]
//! - **Commands** - [`CommandRegistry`] holds the commands plugins add
//! - **Routing** - [`Router`] maps locations to commands, first registered
//!   match wins
//! - **Application** - [`Application`] owns all of the above and exposes the
//!   `started` and `restored` gates
//!
//! # Quick Start
//!
//! ```no_run
//! use hearth_core::{Application, KernelConfig};
//! use hearth_plugin_api::{Activated, ActivationContext, Plugin, PluginError, PluginManifest};
//!
//! struct Hello;
//!
//! impl Plugin for Hello {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::new("example:hello")
//!     }
//!
//!     fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
//!         ctx.log_info("hello");
//!         Ok(Activated::none())
//!     }
//! }
//!
//! # async fn run() -> Result<(), hearth_core::KernelError> {
//! let app = Application::new("example", KernelConfig::default());
//! app.register(Hello)?;
//! let report = app.start().await?;
//! assert_eq!(report.activated, vec!["example:hello"]);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod plugins;
pub mod router;
pub mod services;
pub mod shell;

// Re-export key types for convenience
pub use app::Application;
pub use commands::{CommandInfo, CommandRegistry};
pub use config::{KernelConfig, MissingProviderPolicy, PluginsConfig, RouterConfig};
pub use error::{
    ActivationError, CommandError, ConfigError, KernelError, KernelResult, ResolveError,
    RouterError, ServiceError,
};
pub use plugins::{
    ActivationPlan, BootstrapReport, PluginFailure, PluginHost, PluginInfo, PluginState,
};
pub use router::{
    Location, NavigationSender, RouteDispatch, RouteInfo, RoutedEvent, Router, navigation_channel,
};
pub use services::ServiceRegistry;
pub use shell::{PlacedItem, ShellLayout};
