// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confluo - one HTTP API over LINE, Gmail and Discord.
//!
//! This is the binary entry point for the Confluo proxy.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod poller;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use confluo_config::ConfluoConfig;

/// Confluo - one HTTP API over LINE, Gmail and Discord.
#[derive(Parser, Debug)]
#[command(name = "confluo", version, about, long_about = None)]
struct Cli {
    /// Load this config file instead of the standard search path.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the proxy server (default).
    Serve,
    /// Validate configuration and report which integrations are enabled.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => confluo_config::load_and_validate_path(path),
        None => confluo_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            confluo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            println!("{}", config_summary(&config));
        }
    }
}

/// Human-readable summary printed by `confluo check-config`.
fn config_summary(config: &ConfluoConfig) -> String {
    let enabled = |token: &Option<String>| {
        if token.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            "enabled"
        } else {
            "disabled"
        }
    };
    let mut lines = vec![
        "config ok".to_string(),
        format!("  listen:    {}:{}", config.server.host, config.server.port),
        format!(
            "  api auth:  {}",
            if config.server.bearer_token.is_some() {
                "bearer token"
            } else {
                "none (all /v1 requests rejected)"
            }
        ),
        format!("  cache:     {} messages", config.cache.capacity),
        format!("  line:      {}", enabled(&config.line.channel_access_token)),
        format!("  gmail:     {}", enabled(&config.gmail.access_token)),
        format!("  discord:   {}", enabled(&config.discord.bot_token)),
        format!("  anthropic: {}", enabled(&config.anthropic.api_key)),
    ];
    for (name, settings) in config.breaker.iter() {
        lines.push(format!(
            "  breaker.{name}: timeout {}ms, trips at {}% over {} calls",
            settings.timeout_ms, settings.error_threshold_percentage, settings.volume_threshold
        ));
    }
    lines.join("\n")
}
