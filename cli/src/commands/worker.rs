// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Worker management commands
//!
//! Commands: list, add, remove. All of them talk to a running node.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// List registered workers
    List,

    /// Register a worker on the running node
    Add {
        /// Logical name, used as the first path segment of the mount
        name: String,

        /// Backing directory to serve
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Directory for rendered thumbnails
        #[arg(long, value_name = "DIR")]
        thumbnail_store: PathBuf,

        /// Reject every write to this worker
        #[arg(long)]
        read_only: bool,
    },

    /// Unregister a worker (its directories are left untouched)
    Remove {
        name: String,
    },
}

pub async fn handle_command(command: WorkerCommand, host: &str, port: u16) -> Result<()> {
    let client = DaemonClient::new(host, port)?;

    match command {
        WorkerCommand::List => list(&client).await,
        WorkerCommand::Add {
            name,
            path,
            thumbnail_store,
            read_only,
        } => add(&client, &name, path, thumbnail_store, read_only).await,
        WorkerCommand::Remove { name } => remove(&client, &name).await,
    }
}

async fn list(client: &DaemonClient) -> Result<()> {
    let workers = client.list_workers().await?;

    if workers.is_empty() {
        println!("{}", "No workers registered".dimmed());
        return Ok(());
    }

    println!(
        "{:<16} {:<40} {:<40} {}",
        "NAME".bold(),
        "PATH".bold(),
        "THUMBNAILS".bold(),
        "MODE".bold()
    );
    for worker in workers {
        println!(
            "{:<16} {:<40} {:<40} {}",
            worker.name,
            worker.path.display(),
            worker.thumbnail_store.display(),
            if worker.read_only { "ro" } else { "rw" }
        );
    }
    Ok(())
}

async fn add(
    client: &DaemonClient,
    name: &str,
    path: PathBuf,
    thumbnail_store: PathBuf,
    read_only: bool,
) -> Result<()> {
    // Resolved against the caller's working directory, not the node's
    let path = std::path::absolute(&path).context("Failed to resolve backing directory")?;
    let thumbnail_store =
        std::path::absolute(&thumbnail_store).context("Failed to resolve thumbnail store")?;

    let worker = client.add_worker(name, path, thumbnail_store, read_only).await?;
    println!(
        "{}",
        format!("✓ Worker {} serving {}", worker.name, worker.path.display()).green()
    );
    Ok(())
}

async fn remove(client: &DaemonClient, name: &str) -> Result<()> {
    client.remove_worker(name).await?;
    println!("{}", format!("✓ Worker {} removed", name).green());
    Ok(())
}
