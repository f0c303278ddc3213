//! Plugin system for hearth
//!
//! - [`graph`]: turns manifests into an activation order
//! - [`PluginHost`]: activates plugins in that order and owns what they register
//!
//! # Example
//!
//! ```ignore
//! use hearth_core::plugins::PluginHost;
//!
//! let mut host = PluginHost::new(config, app, commands, router);
//! host.register(Arc::new(PathsPlugin))?;
//! host.register(Arc::new(TreePlugin))?;
//!
//! // Paths activates before the tree that requires it
//! let report = host.bootstrap()?;
//! ```

pub mod graph;
mod host;

pub use graph::{ActivationPlan, Unresolved};
pub use host::{BootstrapReport, PendingTask, PluginFailure, PluginHost, PluginInfo, PluginState};
