// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use nasfed_core::domain::node_config::{NodeConfigManifest, WorkerConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./nasfed-config.yaml")]
        output: PathBuf,

        /// Include example workers
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = NodeConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. NASFED_CONFIG_PATH: {}",
            std::env::var("NASFED_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./nasfed-config.yaml");
        println!("  4. ~/.nasfed/config.yaml");
        println!("  5. /etc/nasfed/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Node:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let spec = &config.spec;
    println!("{}", "Exports:".bold());
    for (label, export) in [("data", &spec.exports.data), ("thumbnails", &spec.exports.thumbnails)] {
        println!(
            "  {} {} on {}:{} (uid {}, gid {})",
            label.bold(),
            export.prefix,
            export.bind_address,
            export.port,
            export.uid,
            export.gid
        );
    }
    println!("  {} {}:{}", "admin api".bold(), spec.api.host, spec.api.port);
    println!();

    println!("{}", "Rendering:".bold());
    println!("  Max concurrent renders: {}", spec.render.max_concurrent_renders);
    println!("  ffmpeg: {}", spec.render.ffmpeg_path);
    println!("  Max image size: {} bytes", spec.render.max_image_bytes);
    println!();

    println!("{}", "Workers:".bold());
    if spec.workers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for worker in &spec.workers {
        println!(
            "  {} {} (thumbnails: {}){}",
            worker.name.bold(),
            worker.path.display(),
            worker.thumbnail_store.display(),
            if worker.read_only { " [read-only]" } else { "" }
        );
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NodeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

/// Default manifest, optionally with two sample workers
pub fn sample_manifest(with_examples: bool) -> NodeConfigManifest {
    let mut manifest = NodeConfigManifest::default();
    if with_examples {
        manifest.spec.workers = vec![
            WorkerConfig {
                name: "diskA".to_string(),
                path: PathBuf::from("/srv/a"),
                thumbnail_store: PathBuf::from("/srv/.thumbs/a"),
                read_only: false,
            },
            WorkerConfig {
                name: "archive".to_string(),
                path: PathBuf::from("/srv/archive"),
                thumbnail_store: PathBuf::from("/srv/.thumbs/archive"),
                read_only: true,
            },
        ];
    }
    manifest
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    sample_manifest(with_examples)
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nasfed-config.yaml");

        generate(&output, true).await.unwrap();

        let manifest = NodeConfigManifest::from_yaml_file(&output).unwrap();
        manifest.validate().unwrap();
        assert_eq!(manifest.spec.workers.len(), 2);
        assert!(manifest.spec.workers[1].read_only);
    }
}
