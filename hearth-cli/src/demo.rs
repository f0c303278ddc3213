//! Demo plugin set booted by the CLI
//!
//! A small notebook-style application: a paths provider, a shell, an
//! optional translator, a file browser, a notebook opener and a zen mode
//! toggle that only activates on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_core::{Application, KernelConfig, KernelResult};
use hearth_plugin_api::{
    Activated, ActivationContext, Command, CommandOutput, Plugin, PluginError, PluginManifest,
    RouteSpec, ShellArea, Token,
};

pub const PATHS: Token<Paths> = Token::new("hearth-demo:paths");
pub const SHELL: Token<Shell> = Token::new("hearth-demo:shell");
pub const TRANSLATOR: Token<Translator> = Token::new("hearth-demo:translator");

/// Where documents live
#[derive(Debug)]
pub struct Paths {
    pub root: String,
}

/// Shell state shared by the plugins that decorate it
#[derive(Debug, Default)]
pub struct Shell {
    single_document: AtomicBool,
}

impl Shell {
    pub fn mode(&self) -> &'static str {
        if self.single_document.load(Ordering::SeqCst) {
            "single-document"
        } else {
            "multiple-document"
        }
    }

    pub fn is_single_document(&self) -> bool {
        self.single_document.load(Ordering::SeqCst)
    }

    /// Flip the mode, returning the new one
    pub fn toggle_mode(&self) -> &'static str {
        self.single_document.fetch_xor(true, Ordering::SeqCst);
        self.mode()
    }
}

/// Label translator; only English ships with the demo
#[derive(Debug)]
pub struct Translator {
    pub language: String,
}

impl Translator {
    pub fn translate(&self, text: &str) -> String {
        if self.language != "en" {
            tracing::debug!(language = %self.language, "No catalog, keeping source text");
        }
        text.to_string()
    }
}

struct PathsPlugin;

impl Plugin for PathsPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(PATHS.name())
            .description("Document root")
            .provides(&PATHS)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        let root = ctx
            .settings()
            .get::<String>("root")
            .unwrap_or_else(|| "/srv/notebooks".to_string());
        if !root.starts_with('/') {
            return Err(PluginError::config(format!("root must be absolute, got {root}")));
        }
        let root = root.trim_end_matches('/').to_string();
        Ok(Activated::provide(&PATHS, Paths { root }))
    }
}

struct ShellPlugin;

impl Plugin for ShellPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(SHELL.name())
            .description("Application shell")
            .provides(&SHELL)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        ctx.add_to_shell("spacer", ShellArea::Top, 50);
        Ok(Activated::provide(&SHELL, Shell::default()))
    }
}

struct LogoPlugin;

impl Plugin for LogoPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("hearth-demo:logo")
            .description("Logo in the top bar")
            .requires(&SHELL)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        ctx.add_to_shell("logo", ShellArea::Top, 0);
        Ok(Activated::none())
    }
}

struct TranslatorPlugin;

impl Plugin for TranslatorPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(TRANSLATOR.name())
            .description("Label translation")
            .provides(&TRANSLATOR)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        let language = ctx
            .settings()
            .get::<String>("language")
            .unwrap_or_else(|| "en".to_string());
        Ok(Activated::provide(&TRANSLATOR, Translator { language }))
    }
}

struct TreePlugin;

impl Plugin for TreePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("hearth-demo:tree")
            .description("File browser")
            .requires(&PATHS)
            .optional(&TRANSLATOR)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        let paths = ctx.required(&PATHS)?;
        let label = match ctx.optional(&TRANSLATOR) {
            Some(translator) => translator.translate("Open the file browser"),
            None => "Open the file browser".to_string(),
        };
        let page_size = ctx.settings().get::<i64>("page_size").unwrap_or(100);

        ctx.add_command(
            Command::new("tree:open", move |args| {
                let paths = paths.clone();
                async move {
                    let dir = format!("{}{}", paths.root, args.arg(0));
                    Ok(CommandOutput::Text(format!(
                        "browsing {dir} ({page_size} entries per page)"
                    )))
                }
            })
            .label(label),
        )?;
        ctx.register_route(RouteSpec::new("/tree(/.*)?", "tree:open"))?;
        ctx.add_to_shell("filebrowser", ShellArea::Left, 100);
        Ok(Activated::none())
    }
}

struct NotebookPlugin;

impl Plugin for NotebookPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("hearth-demo:notebooks")
            .description("Notebook documents")
            .requires(&PATHS)
            .requires(&SHELL)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        let paths = ctx.required(&PATHS)?;
        let shell = ctx.required(&SHELL)?;

        ctx.add_command(
            Command::new("notebook:open", move |args| {
                let paths = paths.clone();
                let shell = shell.clone();
                async move {
                    let name = args.arg(0);
                    if name.is_empty() {
                        return Err(PluginError::command("no notebook given"));
                    }
                    Ok(CommandOutput::Text(format!(
                        "opened {}/{name} in {} mode",
                        paths.root,
                        shell.mode()
                    )))
                }
            })
            .label("Open a notebook"),
        )?;
        ctx.register_route(RouteSpec::new("/notebooks/(.*)", "notebook:open"))?;

        // Reopen the previous session's documents once the shell is up
        let started = ctx.app().started().clone();
        Ok(Activated::none().with_task(async move {
            if started.wait().await {
                tracing::debug!("Notebook workspace restored");
            }
            Ok(())
        }))
    }
}

struct ZenPlugin;

impl Plugin for ZenPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("hearth-demo:zen")
            .description("Single-document mode toggle")
            .requires(&SHELL)
            .auto_start(false)
    }

    fn activate(&self, ctx: &mut ActivationContext) -> Result<Activated, PluginError> {
        let shell = ctx.required(&SHELL)?;
        let query = shell.clone();
        ctx.add_command(
            Command::new("zen:toggle", move |_| {
                let shell = shell.clone();
                async move { Ok(CommandOutput::Text(shell.toggle_mode().to_string())) }
            })
            .label("Toggle single-document mode")
            .toggled(move || query.is_single_document()),
        )?;
        Ok(Activated::none())
    }
}

/// Every demo plugin, in registration order
pub fn plugins() -> Vec<Arc<dyn Plugin>> {
    // Consumers first: registration order does not decide activation order
    vec![
        Arc::new(NotebookPlugin),
        Arc::new(TreePlugin),
        Arc::new(ZenPlugin),
        Arc::new(LogoPlugin),
        Arc::new(PathsPlugin),
        Arc::new(ShellPlugin),
        Arc::new(TranslatorPlugin),
    ]
}

/// The demo application with all plugins registered, not started
pub fn application(config: KernelConfig) -> KernelResult<Application> {
    let app = Application::new("hearth-demo", config);
    for plugin in plugins() {
        app.register_arc(plugin)?;
    }
    Ok(app)
}
