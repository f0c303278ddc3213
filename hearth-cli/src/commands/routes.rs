//! `hearth routes` - list what bootstrap registered with the router

use anyhow::Result;
use hearth_core::{CommandInfo, KernelConfig, RouteInfo};

use crate::demo;

pub async fn run(config: KernelConfig) -> Result<()> {
    let app = demo::application(config)?;
    let report = app.start().await?;
    for failure in &report.failures {
        tracing::warn!(plugin = %failure.plugin, error = %failure.error, "Plugin failed to activate");
    }

    print!(
        "{}",
        format_registrations(&app.router().routes(), &app.commands().list())
    );
    app.shutdown().await;
    Ok(())
}

/// Routes in matching order, then commands
fn format_registrations(routes: &[RouteInfo], commands: &[CommandInfo]) -> String {
    let mut out = String::from("Routes (first match wins):\n");
    if routes.is_empty() {
        out.push_str("  none\n");
    }
    for route in routes {
        out.push_str(&format!(
            "  {:<24} -> {:<16} [{}]\n",
            route.pattern,
            route.command,
            route.plugin.as_deref().unwrap_or("application")
        ));
    }

    out.push_str("\nCommands:\n");
    for command in commands {
        out.push_str(&format!("  {:<16} {}\n", command.id, command.label));
    }
    out
}
