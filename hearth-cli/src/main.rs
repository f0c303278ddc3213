use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth_core::KernelConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod demo;

#[derive(Parser)]
#[command(name = "hearth", about = "Boot and inspect a plugin-assembled application")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/hearth/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the demo application and route locations
    Start(commands::start::StartArgs),
    /// Print the resolved activation order without activating
    Plan,
    /// List and configure plugins
    Plugins(commands::plugins::PluginsArgs),
    /// List route and command registrations after bootstrap
    Routes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(KernelConfig::default_path);
    let config = KernelConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // RUST_LOG wins over both --verbose and the config file
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Start(args) => commands::start::run(args, config).await,
        Commands::Plan => commands::plan::run(config),
        Commands::Plugins(args) => commands::plugins::run(args, config, &config_path),
        Commands::Routes => commands::routes::run(config).await,
    }
}
