//! URL router
//!
//! Maps locations to commands through an ordered list of patterns. The first
//! registered pattern that matches wins and its command runs as a Tokio
//! task; routing never waits for the handler.
//!
//! - [`Router`]: registrations, current location, dispatch
//! - [`NavigationSender`]: the navigation source, one routing pass per send
//! - [`RouteDispatch`]: handle to a running route handler

mod location;
mod pattern;

pub use location::Location;
pub use pattern::RoutePattern;

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use hearth_plugin_api::{CommandOutput, ReadySignal};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::commands::CommandRegistry;
use crate::error::RouterError;

/// Capacity of the routed event channel
const ROUTED_CHANNEL_CAPACITY: usize = 64;

/// A route registered with the router
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    /// Plugin that registered the route, `None` for direct registrations
    pub plugin: Option<String>,
    pub pattern: RoutePattern,
    pub command: String,
}

/// Summary of a registered route, for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub pattern: String,
    pub command: String,
    pub plugin: Option<String>,
}

/// Emitted once per routing pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEvent {
    pub pass_id: Uuid,
    pub location: Location,
    /// Command the location matched, `None` when nothing matched
    pub command: Option<String>,
}

/// Handle to a dispatched route handler.
///
/// Dropping the handle detaches the handler, it keeps running.
#[derive(Debug)]
pub struct RouteDispatch {
    pass_id: Uuid,
    command: String,
    location: Location,
    handle: JoinHandle<Result<CommandOutput, RouterError>>,
}

impl RouteDispatch {
    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Wait for the handler to finish
    pub async fn wait(self) -> Result<CommandOutput, RouterError> {
        match self.handle.await {
            Ok(result) => result,
            Err(_) => Err(RouterError::HandlerPanicked {
                command: self.command,
                path: self.location.path,
            }),
        }
    }
}

/// Sends navigation events to a listening router
#[derive(Debug, Clone)]
pub struct NavigationSender {
    tx: mpsc::UnboundedSender<String>,
}

impl NavigationSender {
    /// Queue a location to be routed. Returns `false` once the listener has stopped.
    pub fn navigate(&self, location: impl Into<String>) -> bool {
        self.tx.send(location.into()).is_ok()
    }
}

/// Receiving end of the navigation source
#[derive(Debug)]
pub struct NavigationReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Create a connected navigation source
pub fn navigation_channel() -> (NavigationSender, NavigationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NavigationSender { tx }, NavigationReceiver { rx })
}

/// Ordered pattern router
#[derive(Debug)]
pub struct Router {
    base_url: String,
    routes: RwLock<Vec<RegisteredRoute>>,
    current: RwLock<Location>,
    commands: Arc<CommandRegistry>,
    routed: broadcast::Sender<RoutedEvent>,
}

impl Router {
    pub fn new(commands: Arc<CommandRegistry>, base_url: impl Into<String>) -> Self {
        let (routed, _) = broadcast::channel(ROUTED_CHANNEL_CAPACITY);
        let base_url = base_url.into();
        Self {
            current: RwLock::new(Location::parse("/", &base_url)),
            base_url,
            routes: RwLock::new(Vec::new()),
            commands,
            routed,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a route after every existing one
    pub fn register(
        &self,
        pattern: &str,
        command: impl Into<String>,
    ) -> Result<(), RouterError> {
        let pattern = RoutePattern::compile(pattern)?;
        self.insert(None, pattern, command.into());
        Ok(())
    }

    /// Append an already compiled route
    pub fn insert(&self, plugin: Option<&str>, pattern: RoutePattern, command: String) {
        tracing::debug!(pattern = pattern.as_str(), command = %command, "Route registered");
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RegisteredRoute {
                plugin: plugin.map(str::to_string),
                pattern,
                command,
            });
    }

    /// Registered routes in match order
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| RouteInfo {
                pattern: r.pattern.as_str().to_string(),
                command: r.command.clone(),
                plugin: r.plugin.clone(),
            })
            .collect()
    }

    /// The last navigated location
    pub fn current(&self) -> Location {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to routing passes
    pub fn subscribe(&self) -> broadcast::Receiver<RoutedEvent> {
        self.routed.subscribe()
    }

    /// Set the current location without routing it
    pub fn set_current(&self, raw: &str) -> Location {
        let location = Location::parse(raw, &self.base_url);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = location.clone();
        location
    }

    /// Set the current location and route it
    pub fn navigate(&self, raw: &str) -> Option<RouteDispatch> {
        let location = self.set_current(raw);
        self.dispatch(location)
    }

    /// Route the current location again
    pub fn route_current(&self) -> Option<RouteDispatch> {
        self.dispatch(self.current())
    }

    /// Route `raw` without changing the current location.
    ///
    /// Returns `None` when no pattern matches. Must be called within a
    /// Tokio runtime.
    pub fn route(&self, raw: &str) -> Option<RouteDispatch> {
        self.dispatch(Location::parse(raw, &self.base_url))
    }

    fn dispatch(&self, location: Location) -> Option<RouteDispatch> {
        let pass_id = Uuid::now_v7();
        let matched = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            routes.iter().find_map(|route| {
                route
                    .pattern
                    .match_location(&location)
                    .map(|args| (route.command.clone(), args))
            })
        };

        let _ = self.routed.send(RoutedEvent {
            pass_id,
            location: location.clone(),
            command: matched.as_ref().map(|(command, _)| command.clone()),
        });

        let Some((command, args)) = matched else {
            tracing::debug!(path = %location.path, "No route matched");
            return None;
        };
        tracing::debug!(%pass_id, path = %location.path, command = %command, "Routing");

        let commands = self.commands.clone();
        let task_command = command.clone();
        let path = location.path.clone();
        let handle = tokio::spawn(async move {
            let run = AssertUnwindSafe(commands.run(&task_command, args)).catch_unwind();
            match run.await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(source)) => {
                    tracing::warn!(command = %task_command, path = %path, error = %source, "Route handler failed");
                    Err(RouterError::HandlerFailure {
                        command: task_command,
                        path,
                        source,
                    })
                }
                Err(_) => {
                    tracing::error!(command = %task_command, path = %path, "Route handler panicked");
                    Err(RouterError::HandlerPanicked {
                        command: task_command,
                        path,
                    })
                }
            }
        });

        Some(RouteDispatch {
            pass_id,
            command,
            location,
            handle,
        })
    }

    /// Route the current location once `started` is ready, then every
    /// navigation event until `shutdown` is cancelled.
    ///
    /// Passes are neither coalesced nor cancelled; a handler still running
    /// when the next event arrives keeps running.
    pub fn listen(
        self: &Arc<Self>,
        started: ReadySignal,
        mut navigation: NavigationReceiver,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                ready = started.wait() => {
                    if !ready {
                        tracing::warn!("Application never started, router not listening");
                        return;
                    }
                }
                _ = shutdown.cancelled() => return,
            }

            router.route_current();

            loop {
                tokio::select! {
                    event = navigation.rx.recv() => match event {
                        Some(raw) => {
                            router.navigate(&raw);
                        }
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                }
            }
            tracing::debug!("Router stopped listening");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_plugin_api::{Command, CommandArgs, PluginError, ReadinessGate};
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, CommandArgs)>>>;

    fn recorder(id: &'static str, calls: &Calls) -> Command {
        let calls = calls.clone();
        Command::new(id, move |args| {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push((id.to_string(), args));
                Ok(CommandOutput::Success)
            }
        })
    }

    fn router_with(commands: Vec<Command>) -> Arc<Router> {
        let registry = Arc::new(CommandRegistry::new());
        registry.register("test", commands).unwrap();
        Arc::new(Router::new(registry, "/"))
    }

    #[tokio::test]
    async fn test_first_registered_match_wins() {
        let calls = Calls::default();
        let router = router_with(vec![recorder("a", &calls), recorder("b", &calls)]);
        router.register("/x/.*", "a").unwrap();
        router.register("/x/(.*)", "b").unwrap();

        for _ in 0..5 {
            let dispatch = router.route("/x/y").unwrap();
            assert_eq!(dispatch.command(), "a");
            dispatch.wait().await.unwrap();
        }
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 5);
        assert!(calls.iter().all(|(id, _)| id == "a"));
    }

    #[tokio::test]
    async fn test_unmatched_path_does_nothing() {
        let calls = Calls::default();
        let router = router_with(vec![recorder("open", &calls)]);
        router.register("/notebooks/(.*)", "open").unwrap();

        assert!(router.route("/files/x").is_none());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_is_reported_and_router_keeps_serving() {
        let calls = Calls::default();
        let failing = Command::new("broken", |_| async {
            Err::<CommandOutput, _>(PluginError::custom("nope"))
        });
        let router = router_with(vec![failing, recorder("ok", &calls)]);
        router.register("/broken", "broken").unwrap();
        router.register("/ok", "ok").unwrap();

        let err = router.route("/broken").unwrap().wait().await.unwrap_err();
        assert!(matches!(err, RouterError::HandlerFailure { ref command, .. } if command == "broken"));

        router.route("/ok").unwrap().wait().await.unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let panicking = Command::new("panics", |args: CommandArgs| async move {
            if args.args.is_empty() {
                panic!("handler exploded");
            }
            Ok(CommandOutput::Success)
        });
        let router = router_with(vec![panicking]);
        router.register("/boom", "panics").unwrap();

        let err = router.route("/boom").unwrap().wait().await.unwrap_err();
        assert!(matches!(err, RouterError::HandlerPanicked { .. }));
    }

    #[tokio::test]
    async fn test_unknown_command_is_handler_failure() {
        let router = router_with(vec![]);
        router.register("/ghost", "ghost:open").unwrap();

        let err = router.route("/ghost").unwrap().wait().await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::HandlerFailure {
                source: crate::error::CommandError::Unknown { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_navigate_updates_current_and_broadcasts() {
        let calls = Calls::default();
        let router = router_with(vec![recorder("tree", &calls)]);
        router.register("/tree(/.*)?", "tree").unwrap();
        let mut routed = router.subscribe();

        router.navigate("/tree/docs?x=1").unwrap().wait().await.unwrap();
        assert_eq!(router.current().path, "/tree/docs");

        let event = routed.recv().await.unwrap();
        assert_eq!(event.command.as_deref(), Some("tree"));
        assert_eq!(event.location.search, "?x=1");

        assert!(router.navigate("/nowhere").is_none());
        let event = routed.recv().await.unwrap();
        assert!(event.command.is_none());
        assert_eq!(router.current().path, "/nowhere");
    }

    #[tokio::test]
    async fn test_route_does_not_change_current() {
        let router = router_with(vec![]);
        router.navigate("/tree");
        router.route("/elsewhere");
        assert_eq!(router.current().path, "/tree");
    }

    #[tokio::test]
    async fn test_listener_routes_initial_then_navigation() {
        let calls = Calls::default();
        let router = router_with(vec![recorder("open", &calls)]);
        router.register("/notebooks/(.*)", "open").unwrap();
        router.navigate("/start");

        let gate = ReadinessGate::new();
        let shutdown = CancellationToken::new();
        let (tx, rx) = navigation_channel();
        let mut routed = router.subscribe();
        let listener = router.listen(gate.signal(), rx, shutdown.clone());

        tx.navigate("/notebooks/a.ipynb");
        tokio::task::yield_now().await;
        assert!(calls.lock().unwrap().is_empty());

        gate.open();
        let initial = routed.recv().await.unwrap();
        assert_eq!(initial.location.path, "/start");
        let first = routed.recv().await.unwrap();
        assert_eq!(first.command.as_deref(), Some("open"));

        shutdown.cancel();
        listener.await.unwrap();
        assert!(!tx.navigate("/notebooks/late.ipynb"));
    }

    #[test]
    fn test_routes_listing_keeps_order() {
        let router = router_with(vec![]);
        router.register("/b", "b").unwrap();
        router.register("/a", "a").unwrap();

        let routes = router.routes();
        assert_eq!(routes[0].pattern, "/b");
        assert_eq!(routes[1].command, "a");
        assert!(routes[0].plugin.is_none());
    }

    #[test]
    fn test_register_invalid_pattern() {
        let router = router_with(vec![]);
        assert!(router.register("(", "x").is_err());
        assert!(router.routes().is_empty());
    }
}
