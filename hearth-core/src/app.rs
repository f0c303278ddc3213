//! Application - owns the plugin host, commands and router
//!
//! Lifecycle:
//! 1. register plugins
//! 2. [`Application::start`] resolves and activates them, opens the
//!    `started` gate and starts routing
//! 3. background tasks returned by activations run; once all of them have
//!    finished the `restored` gate opens
//! 4. [`Application::shutdown`] stops the navigation listener

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hearth_plugin_api::{
    AppHandle, CommandArgs, CommandOutput, Plugin, ReadinessGate, ReadySignal, ShellArea, Token,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::commands::CommandRegistry;
use crate::config::KernelConfig;
use crate::error::{CommandError, KernelError, KernelResult};
use crate::plugins::{ActivationPlan, BootstrapReport, PendingTask, PluginHost, PluginInfo, PluginState};
use crate::router::{NavigationReceiver, NavigationSender, Router, navigation_channel};
use crate::shell::PlacedItem;

/// A running hearth application
pub struct Application {
    name: String,
    config: KernelConfig,
    host: Arc<Mutex<PluginHost>>,
    commands: Arc<CommandRegistry>,
    router: Arc<Router>,
    started: ReadinessGate,
    restored: ReadinessGate,
    navigation: NavigationSender,
    navigation_rx: Mutex<Option<NavigationReceiver>>,
    shutdown: CancellationToken,
    listener: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Application {
    pub fn new(name: impl Into<String>, config: KernelConfig) -> Self {
        let name = name.into();
        let commands = Arc::new(CommandRegistry::new());
        let router = Arc::new(Router::new(commands.clone(), config.router.base_url.clone()));
        router.set_current(&config.router.initial_path);

        let started = ReadinessGate::new();
        let restored = ReadinessGate::new();
        let app = AppHandle::new(
            name.clone(),
            commands.clone(),
            started.signal(),
            restored.signal(),
        );
        let host = PluginHost::new(config.clone(), app, commands.clone(), router.clone());
        let (navigation, navigation_rx) = navigation_channel();

        Self {
            name,
            config,
            host: Arc::new(Mutex::new(host)),
            commands,
            router,
            started,
            restored,
            navigation,
            navigation_rx: Mutex::new(Some(navigation_rx)),
            shutdown: CancellationToken::new(),
            listener: tokio::sync::Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn host(&self) -> MutexGuard<'_, PluginHost> {
        lock(&self.host)
    }

    /// Register a plugin
    pub fn register(&self, plugin: impl Plugin + 'static) -> KernelResult<()> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&self, plugin: Arc<dyn Plugin>) -> KernelResult<()> {
        Ok(self.host().register(plugin)?)
    }

    /// Resolve the bootstrap order without activating anything
    pub fn plan(&self) -> KernelResult<ActivationPlan> {
        Ok(self.host().plan()?)
    }

    /// Bootstrap the application.
    ///
    /// Activates every auto-start plugin, opens the `started` gate, spawns
    /// the activation tasks and starts the navigation listener, which routes
    /// the initial location first. Resolution errors leave the application
    /// unstarted.
    pub async fn start(&self) -> KernelResult<BootstrapReport> {
        if self.started.is_open() {
            return Err(KernelError::AlreadyStarted);
        }

        let (report, tasks) = {
            let mut host = self.host();
            let report = host.bootstrap()?;
            (report, host.take_tasks())
        };

        self.started.open();
        tracing::info!(app = %self.name, activated = report.activated.len(), "Application started");

        let running = spawn_tasks(tasks);
        tokio::spawn(supervise(
            Arc::clone(&self.host),
            running,
            Some(self.restored.clone()),
        ));

        let navigation = lock(&self.navigation_rx).take();
        if let Some(navigation) = navigation {
            let listener = self
                .router
                .listen(self.started.signal(), navigation, self.shutdown.child_token());
            *self.listener.lock().await = Some(listener);
        }

        Ok(report)
    }

    /// Stop the navigation listener. Handlers already dispatched keep running.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(listener) = self.listener.lock().await.take()
            && let Err(e) = listener.await
        {
            tracing::warn!(error = %e, "Navigation listener ended abnormally");
        }
        tracing::info!(app = %self.name, "Application shut down");
    }

    // ─── Handles ─────────────────────────────────────────────────────

    /// Handle given to plugins and command handlers
    pub fn handle(&self) -> AppHandle {
        self.host().app().clone()
    }

    /// The navigation source; every location sent is routed once
    pub fn navigation(&self) -> NavigationSender {
        self.navigation.clone()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    pub fn started(&self) -> ReadySignal {
        self.started.signal()
    }

    pub fn restored(&self) -> ReadySignal {
        self.restored.signal()
    }

    /// Run a registered command
    pub async fn execute(&self, id: &str, args: CommandArgs) -> Result<CommandOutput, CommandError> {
        self.commands.run(id, args).await
    }

    // ─── Plugins ─────────────────────────────────────────────────────

    /// Activate a plugin on demand, with every provider it requires.
    ///
    /// Must be called within a Tokio runtime when the activated plugins
    /// return background tasks.
    pub fn activate_plugin(&self, id: &str) -> KernelResult<()> {
        let (result, tasks) = {
            let mut host = self.host();
            (host.activate_plugin(id), host.take_tasks())
        };
        self.supervise_detached(tasks);
        result
    }

    /// Resolve a service, activating its provider on demand
    pub fn resolve_required_service<T: Any + Send + Sync>(
        &self,
        token: &Token<T>,
    ) -> KernelResult<Arc<T>> {
        let (result, tasks) = {
            let mut host = self.host();
            (host.resolve_required_service(token), host.take_tasks())
        };
        self.supervise_detached(tasks);
        result
    }

    /// Resolve a service if it can be provided, `None` otherwise
    pub fn resolve_optional_service<T: Any + Send + Sync>(&self, token: &Token<T>) -> Option<Arc<T>> {
        let (result, tasks) = {
            let mut host = self.host();
            (host.resolve_optional_service(token), host.take_tasks())
        };
        self.supervise_detached(tasks);
        result
    }

    fn supervise_detached(&self, tasks: Vec<PendingTask>) {
        if tasks.is_empty() {
            return;
        }
        let running = spawn_tasks(tasks);
        tokio::spawn(supervise(Arc::clone(&self.host), running, None));
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.host().has_plugin(id)
    }

    pub fn is_plugin_activated(&self, id: &str) -> bool {
        self.host().is_plugin_activated(id)
    }

    pub fn plugin_state(&self, id: &str) -> Option<PluginState> {
        self.host().plugin_state(id)
    }

    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.host().list_plugins()
    }

    /// Plugins activated so far, in activation order
    pub fn activation_order(&self) -> Vec<String> {
        self.host().activation_order().to_vec()
    }

    /// Registered capabilities in registration order
    pub fn capabilities(&self) -> Vec<String> {
        self.host()
            .services()
            .capabilities()
            .map(str::to_string)
            .collect()
    }

    /// Items attached to a shell area, lowest rank first
    pub fn shell_items(&self, area: ShellArea) -> Vec<PlacedItem> {
        self.host().shell_items(area).to_vec()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type RunningTask = (String, JoinHandle<Result<(), hearth_plugin_api::PluginError>>);

fn spawn_tasks(tasks: Vec<PendingTask>) -> Vec<RunningTask> {
    tasks
        .into_iter()
        .map(|pending| (pending.plugin, tokio::spawn(pending.task)))
        .collect()
}

/// Wait for activation tasks, recording failures, then open `restored`
async fn supervise(
    host: Arc<Mutex<PluginHost>>,
    running: Vec<RunningTask>,
    restored: Option<ReadinessGate>,
) {
    for (plugin, handle) in running {
        let failure = match handle.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("task panicked: {e}")),
        };
        match failure {
            Some(error) => lock(&host).mark_task_failed(&plugin, error),
            None => tracing::debug!(plugin = %plugin, "Plugin task finished"),
        }
    }
    if let Some(gate) = restored {
        gate.open();
        tracing::info!("Application restored");
    }
}
