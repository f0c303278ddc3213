//! `hearth start` - boot the demo application and route locations

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use hearth_core::{BootstrapReport, KernelConfig, RoutedEvent};
use hearth_plugin_api::{CommandOutput, ShellArea};

use crate::demo;

const AREAS: [ShellArea; 6] = [
    ShellArea::Top,
    ShellArea::Menu,
    ShellArea::Left,
    ShellArea::Main,
    ShellArea::Right,
    ShellArea::Down,
];

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Locations to route after the initial one, e.g. /notebooks/intro.ipynb
    pub paths: Vec<String>,

    /// Seconds to wait for background restore work before exiting
    #[arg(long, default_value_t = 5)]
    pub restore_timeout: u64,
}

pub async fn run(args: StartArgs, config: KernelConfig) -> Result<()> {
    let app = demo::application(config)?;
    let mut routed = app.router().subscribe();

    let report = app.start().await?;
    print!("{}", format_report(&report));

    let shell: Vec<_> = AREAS
        .iter()
        .map(|area| (area, app.shell_items(*area)))
        .filter(|(_, items)| !items.is_empty())
        .collect();
    if !shell.is_empty() {
        println!();
        println!("Shell:");
        for (area, items) in shell {
            let ids: Vec<&str> = items.iter().map(|placed| placed.item.id.as_str()).collect();
            println!("  {:<6} {}", area.as_str(), ids.join(", "));
        }
    }

    // The listener routes the initial location before anything else
    println!();
    match tokio::time::timeout(Duration::from_secs(1), routed.recv()).await {
        Ok(Ok(event)) => println!("{}", describe_initial(&event)),
        _ => println!("Initial location was not routed"),
    }

    for path in &args.paths {
        match app.router().navigate(path) {
            Some(dispatch) => {
                let command = dispatch.command().to_string();
                match dispatch.wait().await {
                    Ok(output) => println!("{path} -> {command}: {}", render(&output)),
                    Err(e) => println!("{path} -> {command}: error: {e}"),
                }
            }
            None => println!("{path}: no matching route"),
        }
    }

    let restored = app.restored();
    let timeout = Duration::from_secs(args.restore_timeout);
    if tokio::time::timeout(timeout, restored.wait()).await.is_err() {
        tracing::warn!(timeout_secs = args.restore_timeout, "Restore did not finish in time");
    }

    app.shutdown().await;
    Ok(())
}

fn format_report(report: &BootstrapReport) -> String {
    let mut out = format!("Activated {} plugin(s):\n", report.activated.len());
    for id in &report.activated {
        out.push_str(&format!("  ✓ {id}\n"));
    }
    if !report.is_clean() {
        out.push_str(&format!("Failed {} plugin(s):\n", report.failures.len()));
        for failure in &report.failures {
            out.push_str(&format!("  ✗ {}: {}\n", failure.plugin, failure.error));
        }
    }
    out
}

fn describe_initial(event: &RoutedEvent) -> String {
    match &event.command {
        Some(command) => format!("Initial location {} -> {command}", event.location),
        None => format!("Initial location {} matched no route", event.location),
    }
}

fn render(output: &CommandOutput) -> &str {
    match output {
        CommandOutput::Text(text) => text,
        CommandOutput::Success => "ok",
    }
}
