//! Plugin listing and configuration commands

use std::path::Path;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use hearth_core::{KernelConfig, PluginInfo, PluginState};

use crate::demo;

/// Plugin management arguments
#[derive(Debug, Args)]
pub struct PluginsArgs {
    #[command(subcommand)]
    pub command: Option<PluginsCommand>,
}

/// Plugin subcommands; `list` when omitted
#[derive(Debug, Subcommand)]
pub enum PluginsCommand {
    /// List registered plugins
    List,
    /// Remove a plugin from the disabled and deferred lists
    Enable {
        /// Plugin id
        id: String,
    },
    /// Leave a plugin out entirely
    Disable {
        /// Plugin id
        id: String,
    },
    /// Activate a plugin on demand only
    Defer {
        /// Plugin id
        id: String,
    },
    /// Show plugin details
    Info {
        /// Plugin id
        id: String,
    },
}

pub fn run(args: PluginsArgs, config: KernelConfig, config_path: &Path) -> Result<()> {
    match args.command.unwrap_or(PluginsCommand::List) {
        PluginsCommand::List => list_plugins(config),
        PluginsCommand::Enable { id } => update(config, config_path, &id, Change::Enable),
        PluginsCommand::Disable { id } => update(config, config_path, &id, Change::Disable),
        PluginsCommand::Defer { id } => update(config, config_path, &id, Change::Defer),
        PluginsCommand::Info { id } => show_plugin_info(config, &id),
    }
}

fn list_plugins(config: KernelConfig) -> Result<()> {
    let app = demo::application(config)?;
    for info in app.list_plugins() {
        println!("{}", format_line(&info));
    }
    Ok(())
}

fn format_line(info: &PluginInfo) -> String {
    let (status, mode) = match &info.state {
        PluginState::Disabled { .. } => ("✗", "disabled"),
        _ if info.deferred => ("○", "deferred"),
        _ if !info.manifest.auto_start => ("○", "on demand"),
        _ => ("✓", "auto-start"),
    };
    let description = if info.manifest.description.is_empty() {
        "No description"
    } else {
        &info.manifest.description
    };
    format!("{status} {:<24} {mode:<10} {description}", info.id)
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Enable,
    Disable,
    Defer,
}

fn update(mut config: KernelConfig, path: &Path, id: &str, change: Change) -> Result<()> {
    if !is_known(id) {
        bail!("Unknown plugin '{id}'. Run 'hearth plugins list' to see all plugins.");
    }
    match change {
        Change::Enable => config.enable(id),
        Change::Disable => config.disable(id),
        Change::Defer => config.defer(id),
    }
    config.save(path)?;

    let verb = match change {
        Change::Enable => "Enabled",
        Change::Disable => "Disabled",
        Change::Defer => "Deferred",
    };
    println!("{verb} plugin: {id}");
    println!("Saved {}", path.display());
    Ok(())
}

fn is_known(id: &str) -> bool {
    demo::plugins().iter().any(|plugin| plugin.manifest().id == id)
}

fn show_plugin_info(config: KernelConfig, id: &str) -> Result<()> {
    let app = demo::application(config)?;
    let Some(info) = app.list_plugins().into_iter().find(|info| info.id == id) else {
        println!("Plugin '{id}' not found");
        println!();
        println!("Run 'hearth plugins list' to see all plugins.");
        return Ok(());
    };

    let m = &info.manifest;
    println!("Id:          {}", m.id);
    println!(
        "Description: {}",
        if m.description.is_empty() {
            "No description"
        } else {
            &m.description
        }
    );
    println!("Provides:    {}", m.provides.as_deref().unwrap_or("-"));
    println!("Requires:    {}", list_or_dash(&m.requires));
    println!("Optional:    {}", list_or_dash(&m.optional));
    println!();
    match &info.state {
        PluginState::Disabled { reason } => println!("Status:      Disabled ({reason})"),
        _ if info.deferred => println!("Status:      Deferred"),
        _ if !m.auto_start => println!("Status:      On demand"),
        _ => println!("Status:      Auto-start"),
    }
    Ok(())
}

fn list_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plugins_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: PluginsArgs,
        }

        let cli = TestCli::parse_from(["test"]);
        assert!(cli.args.command.is_none());

        let cli = TestCli::parse_from(["test", "disable", "hearth-demo:logo"]);
        assert!(matches!(
            cli.args.command,
            Some(PluginsCommand::Disable { id }) if id == "hearth-demo:logo"
        ));

        let cli = TestCli::parse_from(["test", "defer", "hearth-demo:tree"]);
        assert!(matches!(cli.args.command, Some(PluginsCommand::Defer { .. })));
    }

    #[test]
    fn test_disable_then_enable_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        update(
            KernelConfig::default(),
            &path,
            "hearth-demo:logo",
            Change::Disable,
        )
        .unwrap();
        let config = KernelConfig::load(&path).unwrap();
        assert!(config.is_disabled("hearth-demo:logo"));

        update(config, &path, "hearth-demo:logo", Change::Enable).unwrap();
        let config = KernelConfig::load(&path).unwrap();
        assert!(!config.is_disabled("hearth-demo:logo"));
    }

    #[test]
    fn test_unknown_plugin_is_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let err = update(KernelConfig::default(), &path, "nope", Change::Defer).unwrap_err();
        assert!(err.to_string().contains("Unknown plugin 'nope'"));
        assert!(!path.exists());
    }

    #[test]
    fn test_list_lines_show_mode() {
        let mut config = KernelConfig::default();
        config.disable("hearth-demo:logo");
        config.defer("hearth-demo:tree");
        let app = demo::application(config).unwrap();
        let lines: Vec<String> = app.list_plugins().iter().map(format_line).collect();

        let line = |id: &str| lines.iter().find(|l| l.contains(id)).unwrap().clone();
        assert!(line("hearth-demo:logo").starts_with("✗"));
        assert!(line("hearth-demo:logo").contains("disabled"));
        assert!(line("hearth-demo:tree").contains("deferred"));
        assert!(line("hearth-demo:zen").contains("on demand"));
        assert!(line("hearth-demo:paths").starts_with("✓"));
        assert!(line("hearth-demo:paths").contains("Document root"));
    }
}
