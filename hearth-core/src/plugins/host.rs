//! PluginHost - resolves and activates plugins
//!
//! Plugins are activated one at a time in resolved order. Each activation is
//! isolated: an error or panic marks that plugin failed, its required
//! consumers fail with it, and everything else keeps activating.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use hearth_plugin_api::{
    ActivationContext, ActivationTask, AppHandle, Plugin, PluginManifest, Service, ShellArea,
    Token,
};

use super::graph::{self, ActivationPlan};
use crate::commands::CommandRegistry;
use crate::config::{KernelConfig, MissingProviderPolicy};
use crate::error::{ActivationError, CommandError, KernelError, ResolveError, ServiceError};
use crate::router::{RoutePattern, Router};
use crate::services::ServiceRegistry;
use crate::shell::{PlacedItem, ShellLayout};

/// State of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    /// Registered, not activated yet
    Inactive,
    /// Activated successfully
    Active,
    /// Left out by configuration
    Disabled { reason: String },
    /// Activation failed or panicked; never retried
    Failed { error: String },
}

/// Information about a plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub id: String,
    pub manifest: PluginManifest,
    pub state: PluginState,
    /// Auto-start plugin held back by configuration
    pub deferred: bool,
}

/// A plugin that failed during bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFailure {
    pub plugin: String,
    pub error: String,
}

/// Outcome of bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Plugins activated, in activation order
    pub activated: Vec<String>,
    pub failures: Vec<PluginFailure>,
}

impl BootstrapReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Background work returned by an activation, not yet spawned
pub struct PendingTask {
    pub plugin: String,
    pub task: ActivationTask,
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask")
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// A registered plugin with its runtime state
struct RegisteredPlugin {
    manifest: PluginManifest,
    instance: Arc<dyn Plugin>,
    state: PluginState,
}

/// The plugin host owns every registry a plugin can write to
pub struct PluginHost {
    /// Plugins in registration order
    plugins: Vec<RegisteredPlugin>,
    index: HashMap<String, usize>,
    config: KernelConfig,
    app: AppHandle,
    services: ServiceRegistry,
    commands: Arc<CommandRegistry>,
    router: Arc<Router>,
    shell: ShellLayout,
    /// Plugins activated so far, in activation order
    activation_order: Vec<String>,
    tasks: Vec<PendingTask>,
}

impl PluginHost {
    pub fn new(
        config: KernelConfig,
        app: AppHandle,
        commands: Arc<CommandRegistry>,
        router: Arc<Router>,
    ) -> Self {
        Self {
            plugins: Vec::new(),
            index: HashMap::new(),
            config,
            app,
            services: ServiceRegistry::new(),
            commands,
            router,
            shell: ShellLayout::new(),
            activation_order: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Register a plugin. Ids must be unique.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), ResolveError> {
        let manifest = plugin.manifest();
        if self.index.contains_key(&manifest.id) {
            return Err(ResolveError::DuplicatePlugin { id: manifest.id });
        }

        let state = if self.config.is_disabled(&manifest.id) {
            PluginState::Disabled {
                reason: "Disabled in configuration".to_string(),
            }
        } else {
            PluginState::Inactive
        };
        tracing::debug!(plugin = %manifest.id, ?state, "Plugin registered");

        self.index.insert(manifest.id.clone(), self.plugins.len());
        self.plugins.push(RegisteredPlugin {
            manifest,
            instance: plugin,
            state,
        });
        Ok(())
    }

    fn is_enabled(plugin: &RegisteredPlugin) -> bool {
        !matches!(plugin.state, PluginState::Disabled { .. })
    }

    fn enabled_manifests(&self) -> Vec<PluginManifest> {
        self.plugins
            .iter()
            .filter(|p| Self::is_enabled(p))
            .map(|p| p.manifest.clone())
            .collect()
    }

    /// Plugins activated by bootstrap: auto-start, not deferred, not disabled
    fn bootstrap_seeds(&self) -> Vec<&str> {
        self.plugins
            .iter()
            .filter(|p| Self::is_enabled(p))
            .filter(|p| p.manifest.auto_start && !self.config.is_deferred(&p.manifest.id))
            .map(|p| p.manifest.id.as_str())
            .collect()
    }

    /// Resolve the bootstrap activation order without activating anything
    pub fn plan(&self) -> Result<ActivationPlan, ResolveError> {
        graph::resolve(&self.enabled_manifests(), &self.bootstrap_seeds())
    }

    /// Activate every auto-start plugin and the providers they require.
    ///
    /// Resolution errors abort before any activation. Activation failures are
    /// recorded in the report.
    pub fn bootstrap(&mut self) -> Result<BootstrapReport, KernelError> {
        let plan = self.plan()?;
        let mut report = BootstrapReport::default();

        if let Some(first) = plan.unresolved.first() {
            match self.config.missing_provider {
                MissingProviderPolicy::Fatal => {
                    tracing::error!(
                        plugin = %first.plugin,
                        capability = %first.capability,
                        "Missing provider, aborting bootstrap"
                    );
                    return Err(ResolveError::from(first.clone()).into());
                }
                MissingProviderPolicy::Isolate => {
                    for unresolved in &plan.unresolved {
                        let error = ResolveError::from(unresolved.clone()).to_string();
                        tracing::warn!(plugin = %unresolved.plugin, error = %error, "Plugin cannot be activated");
                        self.set_state(&unresolved.plugin, PluginState::Failed {
                            error: error.clone(),
                        });
                        report.failures.push(PluginFailure {
                            plugin: unresolved.plugin.clone(),
                            error,
                        });
                    }
                }
            }
        }

        tracing::info!(count = plan.order.len(), "Activating plugins");
        for id in &plan.order {
            match self.activate_one(id) {
                Ok(true) => report.activated.push(id.clone()),
                Ok(false) => {}
                Err(e) => report.failures.push(PluginFailure {
                    plugin: id.clone(),
                    error: e.to_string(),
                }),
            }
        }

        tracing::info!(
            activated = report.activated.len(),
            failed = report.failures.len(),
            "Bootstrap finished"
        );
        Ok(report)
    }

    /// Activate a plugin by id, with every provider it requires.
    ///
    /// A no-op for active plugins; a plugin that failed before reports that
    /// failure again.
    pub fn activate_plugin(&mut self, id: &str) -> Result<(), KernelError> {
        let plugin = self.get(id)?;
        match &plugin.state {
            PluginState::Active => return Ok(()),
            PluginState::Disabled { .. } => {
                return Err(ResolveError::DisabledPlugin { id: id.to_string() }.into());
            }
            PluginState::Failed { error } => {
                return Err(ActivationError::PreviouslyFailed {
                    plugin: id.to_string(),
                    reason: error.clone(),
                }
                .into());
            }
            PluginState::Inactive => {}
        }

        let plan = graph::resolve(&self.enabled_manifests(), &[id])?;
        for unresolved in &plan.unresolved {
            let error = ResolveError::from(unresolved.clone());
            tracing::warn!(plugin = %unresolved.plugin, error = %error, "Plugin cannot be activated");
            self.set_state(&unresolved.plugin, PluginState::Failed {
                error: error.to_string(),
            });
            if unresolved.plugin == id {
                return Err(error.into());
            }
        }

        for dependency in plan.order.iter().filter(|p| p.as_str() != id) {
            if let Err(e) = self.activate_one(dependency) {
                tracing::debug!(plugin = %dependency, error = %e, "Dependency not activated");
            }
        }
        self.activate_one(id)?;
        Ok(())
    }

    /// Activate a single plugin whose providers have already been handled.
    ///
    /// Returns `Ok(false)` when the plugin was already active.
    fn activate_one(&mut self, id: &str) -> Result<bool, ActivationError> {
        let index = self.index[id];
        match &self.plugins[index].state {
            PluginState::Active => return Ok(false),
            PluginState::Failed { error } => {
                return Err(ActivationError::PreviouslyFailed {
                    plugin: id.to_string(),
                    reason: error.clone(),
                });
            }
            PluginState::Disabled { .. } | PluginState::Inactive => {}
        }

        let result = self.run_activation(index);
        match &result {
            Ok(()) => {
                self.plugins[index].state = PluginState::Active;
                self.activation_order.push(id.to_string());
                tracing::info!(plugin = %id, "Plugin activated");
            }
            Err(e) => {
                tracing::error!(plugin = %id, error = %e, "Plugin activation failed");
                self.plugins[index].state = PluginState::Failed {
                    error: e.to_string(),
                };
            }
        }
        result.map(|()| true)
    }

    fn run_activation(&mut self, index: usize) -> Result<(), ActivationError> {
        let manifest = self.plugins[index].manifest.clone();
        let id = manifest.id.as_str();

        // 1. Resolve services
        let mut required = HashMap::new();
        for capability in &manifest.requires {
            match self.services.get(capability) {
                Some(service) => {
                    required.insert(capability.clone(), service.clone());
                }
                None => {
                    return Err(ActivationError::MissingProvider {
                        plugin: id.to_string(),
                        capability: capability.clone(),
                        reason: self.unavailable_reason(capability),
                    });
                }
            }
        }
        let optional = manifest
            .optional
            .iter()
            .map(|capability| (capability.clone(), self.services.get(capability).cloned()))
            .collect();

        let mut context = ActivationContext::new(id, self.app.clone(), required, optional)
            .with_settings(self.config.settings_for(id));

        // 2. Activate with panic isolation
        let instance = Arc::clone(&self.plugins[index].instance);
        let activated = std::panic::catch_unwind(AssertUnwindSafe(|| instance.activate(&mut context)))
            .map_err(|_| ActivationError::Panicked {
                plugin: id.to_string(),
            })?
            .map_err(|source| ActivationError::Failed {
                plugin: id.to_string(),
                source,
            })?;
        let (service, task) = activated.into_parts();

        // 3. Provider contract
        let returned = service.as_ref().map(|s| s.capability().to_string());
        if returned != manifest.provides {
            return Err(ActivationError::ProviderContractViolation {
                plugin: id.to_string(),
                expected: manifest.provides.clone(),
                found: returned,
            });
        }

        // 4. Validate registrations
        let commands = context.take_pending_commands();
        for command in &commands {
            if self.commands.contains(command.id()) {
                return Err(ActivationError::CommandConflict {
                    plugin: id.to_string(),
                    command: command.id().to_string(),
                });
            }
        }
        let mut routes = Vec::new();
        for spec in context.take_pending_routes() {
            let pattern = RoutePattern::compile(&spec.pattern).map_err(|source| {
                ActivationError::InvalidRoute {
                    plugin: id.to_string(),
                    source,
                }
            })?;
            routes.push((pattern, spec.command));
        }
        if let Some(service) = &service
            && self.services.contains(service.capability())
        {
            return Err(ActivationError::Service {
                plugin: id.to_string(),
                source: ServiceError::DuplicateCapability {
                    capability: service.capability().to_string(),
                },
            });
        }

        // 5. Commit: service, commands, routes, shell items
        if let Some(service) = service {
            self.services
                .register(service)
                .map_err(|source| ActivationError::Service {
                    plugin: id.to_string(),
                    source,
                })?;
        }
        self.commands
            .register(id, commands)
            .map_err(|e| ActivationError::CommandConflict {
                plugin: id.to_string(),
                command: match e {
                    CommandError::Duplicate { id } => id,
                    other => other.to_string(),
                },
            })?;
        for (pattern, command) in routes {
            self.router.insert(Some(id), pattern, command);
        }
        self.shell.attach(id, context.take_pending_shell_items());

        if let Some(task) = task {
            self.tasks.push(PendingTask {
                plugin: id.to_string(),
                task,
            });
        }
        Ok(())
    }

    /// Why no service is registered for `capability`
    fn unavailable_reason(&self, capability: &str) -> String {
        let provider = self
            .plugins
            .iter()
            .find(|p| p.manifest.provides.as_deref() == Some(capability));
        match provider {
            Some(p) => match &p.state {
                PluginState::Failed { error } => error.clone(),
                PluginState::Disabled { reason } => reason.clone(),
                _ => format!("provider '{}' is not active", p.manifest.id),
            },
            None => "no plugin provides it".to_string(),
        }
    }

    fn get(&self, id: &str) -> Result<&RegisteredPlugin, ResolveError> {
        self.index
            .get(id)
            .map(|&i| &self.plugins[i])
            .ok_or_else(|| ResolveError::UnknownPlugin { id: id.to_string() })
    }

    fn set_state(&mut self, id: &str, state: PluginState) {
        if let Some(&index) = self.index.get(id) {
            self.plugins[index].state = state;
        }
    }

    /// Record the failure of a plugin's background task. The service it
    /// provided stays registered.
    pub fn mark_task_failed(&mut self, id: &str, error: impl Into<String>) {
        let error = error.into();
        tracing::error!(plugin = %id, error = %error, "Plugin task failed");
        self.set_state(id, PluginState::Failed { error });
    }

    /// Take the background tasks of activations so far
    pub fn take_tasks(&mut self) -> Vec<PendingTask> {
        std::mem::take(&mut self.tasks)
    }

    // ─── Services ────────────────────────────────────────────────────

    /// Resolve a service, activating its provider on demand
    pub fn resolve_required_service<T: Any + Send + Sync>(
        &mut self,
        token: &Token<T>,
    ) -> Result<Arc<T>, KernelError> {
        if !self.services.contains(token.name()) {
            let provider = self
                .plugins
                .iter()
                .find(|p| p.manifest.provides.as_deref() == Some(token.name()) && Self::is_enabled(p))
                .map(|p| p.manifest.id.clone())
                .ok_or_else(|| ServiceError::UnresolvedCapability {
                    capability: token.name().to_string(),
                })?;
            self.activate_plugin(&provider)?;
        }
        Ok(self.services.resolve(token)?)
    }

    /// Resolve a service if a provider exists and activates; `None` otherwise
    pub fn resolve_optional_service<T: Any + Send + Sync>(
        &mut self,
        token: &Token<T>,
    ) -> Option<Arc<T>> {
        match self.resolve_required_service(token) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::debug!(capability = token.name(), error = %e, "Optional service unavailable");
                None
            }
        }
    }

    /// The erased service for a capability, without activating anything
    pub fn service(&self, capability: &str) -> Option<&Service> {
        self.services.get(capability)
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    // ─── Queries ─────────────────────────────────────────────────────

    pub fn has_plugin(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_plugin_activated(&self, id: &str) -> bool {
        self.plugin_state(id) == Some(PluginState::Active)
    }

    pub fn plugin_state(&self, id: &str) -> Option<PluginState> {
        self.get(id).ok().map(|p| p.state.clone())
    }

    /// All plugins in registration order
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|p| PluginInfo {
                id: p.manifest.id.clone(),
                manifest: p.manifest.clone(),
                state: p.state.clone(),
                deferred: self.config.is_deferred(&p.manifest.id),
            })
            .collect()
    }

    /// Get information about a specific plugin
    pub fn get_plugin_info(&self, id: &str) -> Option<PluginInfo> {
        self.list_plugins().into_iter().find(|p| p.id == id)
    }

    /// Plugins activated so far, in activation order
    pub fn activation_order(&self) -> &[String] {
        &self.activation_order
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn shell(&self) -> &ShellLayout {
        &self.shell
    }

    pub fn shell_items(&self, area: ShellArea) -> &[PlacedItem] {
        self.shell.area(area)
    }

    pub fn app(&self) -> &AppHandle {
        &self.app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_plugin_api::{
        Activated, Command, CommandOutput, PluginError, ReadinessGate, RouteSpec,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Paths {
        base_url: String,
    }

    const PATHS: Token<Paths> = Token::new("test:paths");

    /// Configurable test plugin
    struct TestPlugin {
        manifest: PluginManifest,
        activations: Arc<AtomicUsize>,
        behavior: Behavior,
    }

    enum Behavior {
        Nothing,
        ProvidePaths(&'static str),
        Fail,
        Panic,
        ProvideUndeclared,
        AddCommand(&'static str),
        Record(Arc<Mutex<Vec<String>>>),
    }

    impl TestPlugin {
        fn new(manifest: PluginManifest, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                manifest,
                activations: Arc::new(AtomicUsize::new(0)),
                behavior,
            })
        }
    }

    impl Plugin for TestPlugin {
        fn manifest(&self) -> PluginManifest {
            self.manifest.clone()
        }

        fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Nothing => Ok(Activated::none()),
                Behavior::ProvidePaths(base_url) => Ok(Activated::provide(
                    &PATHS,
                    Paths {
                        base_url: base_url.to_string(),
                    },
                )),
                Behavior::Fail => Err(PluginError::custom("activation refused")),
                Behavior::Panic => panic!("plugin exploded"),
                Behavior::ProvideUndeclared => Ok(Activated::provide(
                    &PATHS,
                    Paths {
                        base_url: "/".into(),
                    },
                )),
                Behavior::AddCommand(id) => {
                    ctx.add_command(Command::new(*id, |_| async { Ok(CommandOutput::Success) }))?;
                    ctx.register_route(RouteSpec::new("/cmd/(.*)", *id))?;
                    ctx.add_to_shell(*id, ShellArea::Top, 10);
                    Ok(Activated::none())
                }
                Behavior::Record(seen) => {
                    let paths = ctx.required(&PATHS)?;
                    seen.lock().unwrap().push(paths.base_url.clone());
                    Ok(Activated::none())
                }
            }
        }
    }

    fn host_with(config: KernelConfig) -> PluginHost {
        let commands = Arc::new(CommandRegistry::new());
        let router = Arc::new(Router::new(commands.clone(), "/"));
        let gate = ReadinessGate::new();
        let app = AppHandle::new("test", commands.clone(), gate.signal(), gate.signal());
        PluginHost::new(config, app, commands, router)
    }

    fn host() -> PluginHost {
        host_with(KernelConfig::default())
    }

    fn paths_provider() -> Arc<TestPlugin> {
        TestPlugin::new(
            PluginManifest::new("x").provides(&PATHS),
            Behavior::ProvidePaths("/lab"),
        )
    }

    #[test]
    fn test_provider_activates_before_consumer() {
        let mut host = host();
        let seen = Arc::new(Mutex::new(Vec::new()));
        host.register(TestPlugin::new(
            PluginManifest::new("y").requires(&PATHS),
            Behavior::Record(seen.clone()),
        ))
        .unwrap();
        host.register(paths_provider()).unwrap();

        let report = host.bootstrap().unwrap();
        assert_eq!(report.activated, vec!["x", "y"]);
        assert!(report.is_clean());
        assert_eq!(*seen.lock().unwrap(), vec!["/lab"]);
    }

    #[test]
    fn test_lazy_plugin_not_activated_until_requested() {
        let mut host = host();
        let z = TestPlugin::new(
            PluginManifest::new("z").requires(&PATHS).auto_start(false),
            Behavior::Nothing,
        );
        host.register(paths_provider()).unwrap();
        host.register(z.clone()).unwrap();

        host.bootstrap().unwrap();
        assert!(!host.is_plugin_activated("z"));
        assert_eq!(z.activations.load(Ordering::SeqCst), 0);

        host.activate_plugin("z").unwrap();
        host.activate_plugin("z").unwrap();
        assert!(host.is_plugin_activated("z"));
        assert_eq!(z.activations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_cascades_to_required_consumers_only() {
        let mut host = host();
        host.register(TestPlugin::new(
            PluginManifest::new("x").provides(&PATHS),
            Behavior::Fail,
        ))
        .unwrap();
        host.register(TestPlugin::new(
            PluginManifest::new("needs").requires(&PATHS),
            Behavior::Nothing,
        ))
        .unwrap();
        host.register(TestPlugin::new(
            PluginManifest::new("wants").optional(&PATHS),
            Behavior::Nothing,
        ))
        .unwrap();
        host.register(TestPlugin::new(PluginManifest::new("other"), Behavior::Nothing))
            .unwrap();

        let report = host.bootstrap().unwrap();
        assert_eq!(report.activated, vec!["wants", "other"]);
        let failed: Vec<_> = report.failures.iter().map(|f| f.plugin.as_str()).collect();
        assert_eq!(failed, vec!["x", "needs"]);
        assert!(report.failures[1].error.contains("activation refused"));
        assert!(matches!(
            host.plugin_state("needs"),
            Some(PluginState::Failed { .. })
        ));
    }

    #[test]
    fn test_panic_is_isolated() {
        let mut host = host();
        host.register(TestPlugin::new(PluginManifest::new("bad"), Behavior::Panic))
            .unwrap();
        host.register(TestPlugin::new(PluginManifest::new("good"), Behavior::Nothing))
            .unwrap();

        let report = host.bootstrap().unwrap();
        assert_eq!(report.activated, vec!["good"]);
        assert!(report.failures[0].error.contains("panicked"));
    }

    #[test]
    fn test_failed_plugin_is_never_rerun() {
        let mut host = host();
        let lazy = TestPlugin::new(PluginManifest::new("lazy").auto_start(false), Behavior::Fail);
        host.register(lazy.clone()).unwrap();
        host.bootstrap().unwrap();

        let err = host.activate_plugin("lazy").unwrap_err();
        assert!(matches!(err, KernelError::Activation(ActivationError::Failed { .. })));
        let err = host.activate_plugin("lazy").unwrap_err();
        assert!(matches!(
            err,
            KernelError::Activation(ActivationError::PreviouslyFailed { .. })
        ));
        assert_eq!(lazy.activations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_declared_provider_must_provide() {
        let mut host = host();
        host.register(TestPlugin::new(
            PluginManifest::new("x").provides(&PATHS),
            Behavior::Nothing,
        ))
        .unwrap();

        let report = host.bootstrap().unwrap();
        assert!(report.failures[0].error.contains("provider contract"));
        assert!(host.services().is_empty());
    }

    #[test]
    fn test_undeclared_service_is_violation() {
        let mut host = host();
        host.register(TestPlugin::new(
            PluginManifest::new("sneaky"),
            Behavior::ProvideUndeclared,
        ))
        .unwrap();

        let report = host.bootstrap().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(!host.services().contains("test:paths"));
    }

    #[test]
    fn test_registrations_are_committed() {
        let mut host = host();
        host.register(TestPlugin::new(
            PluginManifest::new("cmd"),
            Behavior::AddCommand("cmd:run"),
        ))
        .unwrap();

        host.bootstrap().unwrap();
        assert!(host.app().has_command("cmd:run"));
        assert_eq!(host.router.routes()[0].plugin.as_deref(), Some("cmd"));
        assert_eq!(host.shell_items(ShellArea::Top)[0].item.id, "cmd:run");
    }

    #[test]
    fn test_command_conflict_commits_nothing() {
        let mut host = host();
        host.register(TestPlugin::new(PluginManifest::new("a"), Behavior::AddCommand("dup")))
            .unwrap();
        host.register(TestPlugin::new(PluginManifest::new("b"), Behavior::AddCommand("dup")))
            .unwrap();

        let report = host.bootstrap().unwrap();
        assert_eq!(report.activated, vec!["a"]);
        assert!(report.failures[0].error.contains("dup"));
        assert_eq!(host.router.routes().len(), 1);
        assert_eq!(host.shell().len(), 1);
    }

    #[test]
    fn test_missing_provider_is_fatal_by_default() {
        let mut host = host();
        let y = TestPlugin::new(PluginManifest::new("y").requires(&PATHS), Behavior::Nothing);
        let other = TestPlugin::new(PluginManifest::new("other"), Behavior::Nothing);
        host.register(y).unwrap();
        host.register(other.clone()).unwrap();

        let err = host.bootstrap().unwrap_err();
        assert!(matches!(
            err,
            KernelError::Resolve(ResolveError::MissingProvider { ref plugin, .. }) if plugin == "y"
        ));
        assert_eq!(other.activations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_provider_isolated_by_policy() {
        let mut config = KernelConfig::default();
        config.missing_provider = MissingProviderPolicy::Isolate;
        let mut host = host_with(config);
        host.register(TestPlugin::new(
            PluginManifest::new("y").requires(&PATHS),
            Behavior::Nothing,
        ))
        .unwrap();
        host.register(TestPlugin::new(PluginManifest::new("other"), Behavior::Nothing))
            .unwrap();

        let report = host.bootstrap().unwrap();
        assert_eq!(report.activated, vec!["other"]);
        assert_eq!(report.failures[0].plugin, "y");
    }

    #[test]
    fn test_disabled_and_deferred_plugins() {
        let mut config = KernelConfig::default();
        config.disable("off");
        config.defer("later");
        let mut host = host_with(config);
        host.register(TestPlugin::new(PluginManifest::new("off"), Behavior::Nothing))
            .unwrap();
        host.register(TestPlugin::new(PluginManifest::new("later"), Behavior::Nothing))
            .unwrap();

        let report = host.bootstrap().unwrap();
        assert!(report.activated.is_empty());
        assert!(matches!(
            host.activate_plugin("off"),
            Err(KernelError::Resolve(ResolveError::DisabledPlugin { .. }))
        ));
        host.activate_plugin("later").unwrap();

        let listed = host.list_plugins();
        assert!(matches!(listed[0].state, PluginState::Disabled { .. }));
        assert!(listed[1].deferred);
    }

    #[test]
    fn test_resolve_required_service_activates_provider() {
        let mut host = host();
        let provider = TestPlugin::new(
            PluginManifest::new("x").provides(&PATHS).auto_start(false),
            Behavior::ProvidePaths("/lazy"),
        );
        host.register(provider.clone()).unwrap();
        host.bootstrap().unwrap();
        assert!(!host.is_plugin_activated("x"));

        let paths = host.resolve_required_service(&PATHS).unwrap();
        assert_eq!(paths.base_url, "/lazy");
        let again = host.resolve_required_service(&PATHS).unwrap();
        assert!(Arc::ptr_eq(&paths, &again));
        assert_eq!(provider.activations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_optional_service_without_provider() {
        let mut host = host();
        assert!(host.resolve_optional_service(&PATHS).is_none());
        assert!(matches!(
            host.resolve_required_service(&PATHS),
            Err(KernelError::Service(ServiceError::UnresolvedCapability { .. }))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut host = host();
        host.register(paths_provider()).unwrap();
        let err = host.register(paths_provider()).unwrap_err();
        assert_eq!(err, ResolveError::DuplicatePlugin { id: "x".into() });
        assert_eq!(host.plugin_count(), 1);
    }

    #[tokio::test]
    async fn test_tasks_are_collected_not_run() {
        struct WithTask(Arc<AtomicUsize>);

        impl Plugin for WithTask {
            fn manifest(&self) -> PluginManifest {
                PluginManifest::new("task")
            }

            fn activate(&self, _ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
                let counter = self.0.clone();
                Ok(Activated::none().with_task(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
            }
        }

        let ran = Arc::new(AtomicUsize::new(0));
        let mut host = host();
        host.register(Arc::new(WithTask(ran.clone()))).unwrap();
        host.bootstrap().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        let tasks = host.take_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].plugin, "task");
        for pending in tasks {
            pending.task.await.unwrap();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(host.take_tasks().is_empty());

        host.mark_task_failed("task", "lost connection");
        assert!(matches!(host.plugin_state("task"), Some(PluginState::Failed { .. })));
    }
}
