// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # nasfed Storage Node Daemon
//!
//! The `nasfedd` binary runs a storage node: it federates the configured
//! worker directories into one NFS export, serves their thumbnails through a
//! second read-only export, and exposes an admin HTTP API.
//!
//! ## Commands
//!
//! - `nasfedd` / `nasfedd serve` - Run the node in the foreground
//! - `nasfedd config show|validate|generate` - Configuration management
//! - `nasfedd worker list|add|remove` - Manage workers of a running node

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use nasfed_cli::commands::{self, ConfigCommand, WorkerCommand};
use nasfed_cli::daemon;

/// nasfed storage node - federated NFS exports with thumbnail cache
#[derive(Parser)]
#[command(name = "nasfedd")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "NASFED_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Admin API host used by client commands
    #[arg(long, global = true, env = "NASFED_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Admin API port used by client commands
    #[arg(long, global = true, env = "NASFED_API_PORT", default_value = "9000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "NASFED_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the storage node in the foreground
    #[command(name = "serve")]
    Serve,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage workers of a running node
    #[command(name = "worker")]
    Worker {
        #[command(subcommand)]
        command: WorkerCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            info!("Starting nasfed storage node");
            daemon::start_daemon(cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Worker { command }) => {
            commands::worker::handle_command(command, &cli.host, cli.port).await
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
